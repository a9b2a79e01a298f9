//! services/functions/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3.0 specification for the functions service to disk,
//! so the frontend client can be generated from it.

use functions_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // An alternative output path can be given as the first argument.
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("✅ OpenAPI specification generated at {}", path);
    Ok(())
}
