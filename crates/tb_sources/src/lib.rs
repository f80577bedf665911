pub mod cli;
pub mod logging;
pub mod manager;
pub mod sources;
pub mod urls;

pub use cli::{handle_command, SourceArgs, SourceCommands};
pub use manager::{FetchGroup, FetchManager, FetchPlan, FetchReport, FetchResult, FetchStep};
pub use sources::{default_sources, http_client, Source, SourceMetadata};

pub mod prelude {
    pub use super::sources::Source;
    pub use tb_core::{Error, ItemType, Result, SourceItem};
}
