//! Tests for request building, response conversion and call checking

use super::*;
use crate::capabilities::HttpMethod;
use crate::config::{FunctionSettings, NumberPolicy};
use crate::diagnostics::{messages, Severity, Span, SyntaxNode, Token};
use crate::error::ConnectorError;
use crate::openapi::ApiDocument;
use crate::registry::FunctionRegistry;
use crate::testing::{CONTACTS_OPENAPI, SQL_SWAGGER};
use crate::types::{FormulaType, RecordType};
use crate::values::Val;
use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

fn contacts(settings: FunctionSettings) -> Vec<Arc<FunctionDescriptor>> {
    let doc = ApiDocument::parse(CONTACTS_OPENAPI).unwrap();
    FunctionRegistry::new()
        .add_action_connector(settings, Some(&doc), None)
        .unwrap()
}

fn crm() -> Vec<Arc<FunctionDescriptor>> {
    contacts(FunctionSettings::new("Crm"))
}

fn sql() -> Vec<Arc<FunctionDescriptor>> {
    let doc = ApiDocument::parse(SQL_SWAGGER).unwrap();
    FunctionRegistry::new()
        .add_platform_action_connector("Sql", Some(&doc), "conn/1")
        .unwrap()
}

fn record(fields: &[(&str, Val)]) -> Val {
    Val::Obj(
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

/* ===================== Request Building ===================== */

#[test]
fn test_query_and_header_parameters() {
    let list = &crm()[0];

    let request = request::build_request(list, &[Val::from(10i64), Val::from("trace-1")]).unwrap();

    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.path_and_query, "/v1/contacts?top=10");
    assert_eq!(request.headers, vec![("X-Trace".to_string(), "trace-1".to_string())]);
    assert_eq!(request.body, None);
}

#[test]
fn test_omitted_optional_parameters_are_skipped() {
    let list = &crm()[0];

    let request = request::build_request(list, &[]).unwrap();
    assert_eq!(request.path_and_query, "/v1/contacts");
    assert!(request.headers.is_empty());

    let request = request::build_request(list, &[Val::Null, Val::from("t")]).unwrap();
    assert_eq!(request.path_and_query, "/v1/contacts");
}

#[test]
fn test_path_values_are_encoded() {
    let get_item = sql().into_iter().find(|f| f.name() == "GetItemV2").unwrap();

    let request = request::build_request(
        &get_item,
        &[Val::from("default"), Val::from("dbo.People"), Val::from("a b/c")],
    )
    .unwrap();

    assert_eq!(
        request.path_and_query,
        "/apim/sql/conn%2F1/v2/datasets/default/tables/dbo.People/items/a%20b%2Fc"
    );
}

#[test]
fn test_path_values_are_not_expanded_twice() {
    let doc = ApiDocument::from_value(json!({
        "swagger": "2.0",
        "paths": {
            "/d/{a}/t/{b}/{a}.json": {
                "get": {
                    "operationId": "Fetch",
                    "parameters": [
                        { "name": "a", "in": "path", "required": true, "type": "string" },
                        { "name": "b", "in": "path", "required": true, "type": "string" }
                    ],
                    "responses": {}
                }
            }
        }
    }))
    .unwrap();
    let functions = FunctionRegistry::new()
        .add_action_connector_in("P", Some(&doc), None)
        .unwrap();

    let request = request::build_request(&functions[0], &[Val::from("{b}"), Val::from("x")]).unwrap();

    assert_eq!(request.path_and_query, "/d/%7Bb%7D/t/x/%7Bb%7D.json");
}

#[test]
fn test_flattened_body() {
    let create = &crm()[1];

    let request = request::build_request(create, &[Val::from("Ada")]).unwrap();

    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.body, Some(json!({ "name": "Ada" })));
}

#[test]
fn test_whole_body_parameter() {
    let post = sql().into_iter().find(|f| f.name() == "PostItemV2").unwrap();
    let item = record(&[("Name", Val::from("Ada")), ("Id", Val::from(3i64))]);

    let request = request::build_request(&post, &[Val::from("d"), Val::from("t"), item]).unwrap();

    assert_eq!(request.body, Some(json!({ "Id": 3.0, "Name": "Ada" })));
}

#[test]
fn test_arity_is_checked() {
    let get = &crm()[2];

    let err = request::build_request(get, &[]).unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument(_)));

    let err = request::build_request(get, &[Val::from(1i64), Val::from(2i64)]).unwrap_err();
    assert!(err.to_string().contains("expects 1 to 1 arguments, got 2"));
}

#[test]
fn test_argument_types_are_checked() {
    let get = &crm()[2];

    let err = request::build_request(get, &[Val::from("seven")]).unwrap_err();
    assert!(err.to_string().contains("parameter 'id' expects Number, got Text"));
}

#[test]
fn test_required_blank_argument_is_rejected() {
    let get = &crm()[2];
    assert!(request::build_request(get, &[Val::Null]).is_err());
}

/* ===================== Response Conversion ===================== */

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[test]
fn test_record_response_is_typed() {
    let get = &crm()[2];
    let body = json!({
        "id": 4,
        "name": "Ada",
        "created": "2024-05-01T12:00:00+02:00",
        "manager": { "id": 1 }
    })
    .to_string();
    let tz = FixedOffset::east_opt(3600).unwrap();

    let val = response::convert_body(body.as_bytes(), get.return_type(), get.settings(), tz);

    let fields = val.as_obj().unwrap();
    assert_eq!(fields["id"], Val::Num(4.0));
    match &fields["created"] {
        Val::DateTime(dt) => {
            assert_eq!(dt.offset().local_minus_utc(), 3600);
            assert_eq!(dt.to_rfc3339(), "2024-05-01T11:00:00+01:00");
        }
        other => panic!("expected a date-time, got {:?}", other),
    }
    // Untyped fields keep their JSON shape
    assert_eq!(fields["manager"], record(&[("id", Val::Num(1.0))]));
}

#[test]
fn test_decimal_policy() {
    let functions = contacts(FunctionSettings::new("Crm").with_number_policy(NumberPolicy::Decimal));
    let get = &functions[2];

    let val = response::convert_body(br#"{ "id": 12.50 }"#, get.return_type(), get.settings(), utc());

    assert_eq!(val.as_obj().unwrap()["id"], Val::Dec(Decimal::from_str("12.50").unwrap()));
}

#[test]
fn test_table_results_are_unwrapped_and_capped() {
    let functions = contacts(FunctionSettings::new("Crm").with_max_rows(2));
    let list = &functions[0];
    let body = json!({ "value": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] }).to_string();

    let val = response::convert_body(body.as_bytes(), list.return_type(), list.settings(), utc());

    let rows = val.as_list().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], record(&[("id", Val::Num(2.0))]));
}

#[test]
fn test_scalar_rows_get_value_column() {
    let list = &crm()[0];
    let val = response::convert_body(br#"["a"]"#, list.return_type(), list.settings(), utc());
    assert_eq!(val, Val::List(vec![record(&[("Value", Val::from("a"))])]));
}

#[test]
fn test_empty_and_non_json_bodies() {
    let delete = &crm()[3];

    assert_eq!(
        response::convert_body(b"", delete.return_type(), delete.settings(), utc()),
        Val::Null
    );
    assert_eq!(
        response::convert_body(b"deleted", delete.return_type(), delete.settings(), utc()),
        Val::from("deleted")
    );
}

#[test]
fn test_zone_less_date_time_is_utc() {
    let row = FormulaType::Record(RecordType::new().add("at", FormulaType::DateTime));
    let ret = crate::types::ReturnType::Resolved(row);
    let tz = FixedOffset::west_opt(5 * 3600).unwrap();

    let val = response::convert_body(
        br#"{ "at": "2024-01-02T03:04:05" }"#,
        &ret,
        &FunctionSettings::new("X"),
        tz,
    );

    match &val.as_obj().unwrap()["at"] {
        Val::DateTime(dt) => assert_eq!(dt.to_rfc3339(), "2024-01-01T22:04:05-05:00"),
        other => panic!("expected a date-time, got {:?}", other),
    }
}

/* ===================== Call Checking ===================== */

struct Node {
    token: Token,
    extent: Span,
}

impl Node {
    fn new(text: &str, min: usize) -> Self {
        let span = Span::new(min, min + text.len());
        Self {
            token: Token::new(text, span),
            extent: span,
        }
    }
}

impl SyntaxNode for Node {
    fn token(&self) -> &Token {
        &self.token
    }

    fn text_span(&self) -> Span {
        self.extent
    }

    fn render(&self) -> String {
        self.token.text.clone()
    }
}

#[test]
fn test_check_call_accepts_valid_call() {
    let get = &crm()[2];
    let call = Node::new("Crm.GetContact", 0);
    let arg = Node::new("4", 15);

    let diagnostics = check_call(&**get, &call, &[CallArg::new(&arg, FormulaType::Number)]);

    assert!(diagnostics.is_empty());
}

#[test]
fn test_check_call_arity() {
    let get = &crm()[2];
    let call = Node::new("Crm.GetContact", 0);

    let diagnostics = check_call(&**get, &call, &[]);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].key(), messages::ERR_BAD_ARITY);
    assert_eq!(
        diagnostics[0].to_string(),
        "[0,14] Crm.GetContact : Invalid number of arguments: received 0, expected 1 to 1."
    );
}

#[test]
fn test_check_call_type_mismatch_at_argument() {
    let get = &crm()[2];
    let call = Node::new("Crm.GetContact", 0);
    let arg = Node::new("\"x\"", 15);

    let diagnostics = check_call(&**get, &call, &[CallArg::new(&arg, FormulaType::Text)]);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].text_span(), Span::new(15, 18));
    assert_eq!(
        diagnostics[0].message(),
        "Invalid argument type. Expecting a Number value, but received a Text value."
    );
}

#[test]
fn test_check_call_warns_on_pending_return() {
    let get_item = sql().into_iter().find(|f| f.name() == "GetItemV2").unwrap();
    let call = Node::new("Sql.GetItemV2", 0);
    let args = [Node::new("\"d\"", 14), Node::new("\"t\"", 19), Node::new("\"1\"", 24)];
    let call_args: Vec<CallArg<'_>> = args
        .iter()
        .map(|n| CallArg::new(n, FormulaType::Text))
        .collect();

    let diagnostics = check_call(&*get_item, &call, &call_args);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity(), Severity::Warning);
    assert_eq!(diagnostics[0].args(), ["Sql.GetItemV2".to_string()]);
}

#[test]
fn test_descriptor_display() {
    let get_item = sql().into_iter().find(|f| f.name() == "GetItemV2").unwrap();
    assert_eq!(
        get_item.to_string(),
        "Sql.GetItemV2(dataset: Text, table: Text, id: Text) -> ?"
    );
}
