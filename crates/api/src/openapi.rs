// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` documentation module
//!
//! This module provides `OpenAPI` specification and `Swagger UI` endpoints for API documentation.

use axum::{Json, extract::State, response::Html};
use utoipa::OpenApi;

use crate::{docs::ApiDoc, state::ServerState};

/// Path of the generated document
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// `OpenAPI` specification endpoint
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Release of the `swagger-ui-dist` assets the docs page loads
const SWAGGER_UI_RELEASE: &str = "5.17.14";

/// Render the docs page for the service `title`
fn docs_page(title: &str) -> String {
    let assets = format!("https://unpkg.com/swagger-ui-dist@{SWAGGER_UI_RELEASE}");
    let title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    format!(
        r##"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | API reference</title>
<link rel="stylesheet" href="{assets}/swagger-ui.css">
</head>
<body>
<main id="api-reference"></main>
<script src="{assets}/swagger-ui-bundle.js" crossorigin></script>
<script>
SwaggerUIBundle({{
  url: "{OPENAPI_JSON_PATH}",
  dom_id: "#api-reference",
  layout: "BaseLayout",
  docExpansion: "list",
  filter: true,
  tryItOutEnabled: true,
  persistAuthorization: true
}});
</script>
</body>
</html>
"##
    )
}

/// Swagger UI endpoint
pub async fn swagger_ui(State(state): State<ServerState>) -> Html<String> {
    Html(docs_page(&state.config().app.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_points_at_the_generated_document() {
        let page = docs_page("Ledger <API>");

        assert!(page.contains(r#"url: "/api-docs/openapi.json""#));
        assert!(page.contains("<title>Ledger &lt;API&gt; | API reference</title>"));
        let bundle = format!("swagger-ui-dist@{SWAGGER_UI_RELEASE}/swagger-ui-bundle.js");
        assert!(page.contains(&bundle));
    }

    #[tokio::test]
    async fn spec_lists_the_api_paths() {
        let Json(doc) = openapi_spec().await;
        assert!(doc.paths.paths.contains_key("/api/health"));
    }
}
