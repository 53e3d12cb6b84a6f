//! Test doubles shared by unit tests

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::capabilities::{HttpInvoker, HttpRequest, HttpResponse, TransportError};

/// What the scripted invoker does for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(String),
    /// Never completes; only cancellation gets the caller out
    Hang,
}

/// Invoker that replays canned replies in order and records every request.
/// Once the script runs out it answers `404`.
#[derive(Default)]
pub struct ScriptedInvoker {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn json(self, body: JsonValue) -> Self {
        self.reply(Reply::Respond(HttpResponse::json(&body)))
    }

    pub fn status(self, status: u16, body: &str) -> Self {
        self.reply(Reply::Respond(HttpResponse::new(status, body)))
    }

    pub fn hang(self) -> Self {
        self.reply(Reply::Hang)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpInvoker for ScriptedInvoker {
    async fn send(
        &self,
        request: HttpRequest,
        _cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportError::Failed(message)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(HttpResponse::new(404, "no scripted reply")),
        }
    }
}

/* ===================== Fixture Documents ===================== */

/// Swagger 2.0 tabular connector in the shape of the SQL connector:
/// `GetItemV2` and `GetItemsV2` overlap lexically and `GetItemV2`'s result is
/// described by `GetTable`.
pub const SQL_SWAGGER: &str = r##"{
  "swagger": "2.0",
  "info": { "title": "SQL Server", "version": "1.0" },
  "host": "example.azure-apim.net",
  "basePath": "/apim/sql",
  "paths": {
    "/{connectionId}/v2/datasets/{dataset}/tables/{table}/items": {
      "parameters": [
        { "name": "connectionId", "in": "path", "required": true, "type": "string" },
        { "name": "dataset", "in": "path", "required": true, "type": "string" },
        { "name": "table", "in": "path", "required": true, "type": "string" }
      ],
      "get": {
        "operationId": "GetItemsV2",
        "parameters": [
          { "name": "$top", "in": "query", "required": false, "type": "integer" },
          { "name": "$filter", "in": "query", "required": false, "type": "string" }
        ],
        "responses": {
          "200": {
            "description": "OK",
            "schema": {
              "type": "object",
              "properties": {
                "value": { "type": "array", "items": { "type": "object" } }
              }
            }
          }
        }
      },
      "post": {
        "operationId": "PostItemV2",
        "parameters": [
          { "name": "item", "in": "body", "required": true, "schema": { "type": "object" } }
        ],
        "responses": { "200": { "description": "OK", "schema": { "type": "object" } } }
      }
    },
    "/{connectionId}/v2/datasets/{dataset}/tables/{table}/items/{id}": {
      "get": {
        "operationId": "GetItemV2",
        "parameters": [
          { "name": "connectionId", "in": "path", "required": true, "type": "string" },
          { "name": "dataset", "in": "path", "required": true, "type": "string" },
          { "name": "table", "in": "path", "required": true, "type": "string" },
          { "name": "id", "in": "path", "required": true, "type": "string" }
        ],
        "responses": {
          "200": {
            "description": "OK",
            "schema": {
              "type": "object",
              "x-ms-dynamic-schema": {
                "operationId": "GetTable",
                "parameters": {
                  "dataset": { "parameter": "dataset" },
                  "table": { "parameter": "table" }
                },
                "value-path": "Schema/Items"
              }
            }
          }
        }
      },
      "delete": {
        "operationId": "DeleteItemV2",
        "parameters": [
          { "name": "connectionId", "in": "path", "required": true, "type": "string" },
          { "name": "dataset", "in": "path", "required": true, "type": "string" },
          { "name": "table", "in": "path", "required": true, "type": "string" },
          { "name": "id", "in": "path", "required": true, "type": "string" }
        ],
        "responses": { "200": { "description": "OK" } }
      }
    },
    "/{connectionId}/$metadata.json/datasets/{dataset}/tables/{table}": {
      "get": {
        "operationId": "GetTable",
        "parameters": [
          { "name": "connectionId", "in": "path", "required": true, "type": "string" },
          { "name": "dataset", "in": "path", "required": true, "type": "string" },
          { "name": "table", "in": "path", "required": true, "type": "string" },
          { "name": "api-version", "in": "query", "required": true, "type": "string",
            "default": "2015-09-01", "x-ms-visibility": "internal" }
        ],
        "responses": {
          "200": { "description": "OK", "schema": { "$ref": "#/definitions/Table" } }
        }
      }
    }
  },
  "definitions": {
    "Table": {
      "type": "object",
      "properties": {
        "name": { "type": "string" },
        "Schema": { "type": "object" }
      }
    }
  }
}"##;

/// What `GetTable` answers for the `Customers` table
pub const SQL_TABLE_METADATA: &str = r#"{
  "name": "Customers",
  "Schema": {
    "type": "array",
    "items": {
      "type": "object",
      "properties": {
        "Id": { "type": "integer" },
        "Name": { "type": "string" },
        "Created": { "type": "string", "format": "date-time" }
      }
    }
  }
}"#;

/// OpenAPI 3 action connector written in YAML
pub const CONTACTS_OPENAPI: &str = r##"
openapi: 3.0.1
info:
  title: Contacts
  version: "1.0"
servers:
  - url: https://api.example.com/v1/
paths:
  /contacts:
    get:
      operationId: ListContacts
      parameters:
        - name: top
          in: query
          schema:
            type: integer
        - name: X-Trace
          in: header
          schema:
            type: string
      responses:
        "200":
          description: OK
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: "#/components/schemas/Contact"
    post:
      operationId: CreateContact
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/NewContact"
      responses:
        "201":
          description: Created
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Contact"
  /contacts/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: integer
    get:
      operationId: GetContact
      responses:
        "200":
          description: OK
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Contact"
    delete:
      responses:
        "204":
          description: Deleted
components:
  schemas:
    NewContact:
      type: object
      required: [name]
      properties:
        name:
          type: string
        email:
          type: string
    Contact:
      type: object
      properties:
        id:
          type: integer
        name:
          type: string
        email:
          type: string
        created:
          type: string
          format: date-time
        manager:
          $ref: "#/components/schemas/Contact"
"##;
