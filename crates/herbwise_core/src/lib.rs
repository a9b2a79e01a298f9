pub mod account;
pub mod domain;
pub mod outcome;
pub mod ports;
pub mod recipes;
pub mod records;
pub mod session;

pub use account::{
    AccountService, reset_token_from_link, ACCOUNT_DELETED_MESSAGE, CONFIRMATION_PENDING_MESSAGE,
    MIN_PASSWORD_LEN,
};
pub use domain::{
    Allergy, AllergyDraft, AuthSession, DeleteOptions, DietaryPreference, Identity, IdentityUpdate,
    Medication, MedicationDraft, Profile, ProfileDraft, PurgeReport, Recipe, RecipeQuery,
    SessionEvent, SessionEventKind, SignUpReceipt, Supplement, SupplementDraft,
};
pub use outcome::{ErrorKind, OpError, Outcome};
pub use ports::{
    AccountAdmin, IdentityProvider, PortError, PortResult, ProfileStore, RecipeSource, RecordStore,
};
pub use recipes::{build_query, RecipeService, DEFAULT_SEARCH_TERM, DEFAULT_SUGGESTION_COUNT};
pub use records::RecordsService;
pub use session::{ListenerGuard, SessionSnapshot, SessionTracker};
