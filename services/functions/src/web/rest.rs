//! services/functions/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::OpenApi;

use crate::web::account::{DeleteAccountRequest, DeleteAccountResponse, ErrorResponse};
use crate::web::recipes::{RecipeResult, SearchResponse};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::account::delete_account_handler,
        crate::web::recipes::search_recipes_handler,
    ),
    components(
        schemas(
            DeleteAccountRequest,
            DeleteAccountResponse,
            ErrorResponse,
            RecipeResult,
            SearchResponse
        )
    ),
    tags(
        (name = "HerbWise Functions", description = "Privileged server-side endpoints for the HerbWise app.")
    )
)]
pub struct ApiDoc;
