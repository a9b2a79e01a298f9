pub mod functions;
pub mod gotrue;
pub mod postgrest;

mod http;

pub use functions::FunctionsClient;
pub use gotrue::GoTrueProvider;
pub use postgrest::PostgrestStore;
