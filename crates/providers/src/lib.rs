pub mod moderation;
pub mod openai_compatible;
pub mod scanner;
pub mod traits;

pub use moderation::RemoteModerator;
pub use openai_compatible::OpenAICompatibleGenerator;
pub use scanner::{DisabledScanner, UrlScanner};
pub use traits::{
    CodeGenerator, ContentScanner, ImageModerator, Message, ModerationVerdict, ProviderError,
    ScanOutcome,
};
