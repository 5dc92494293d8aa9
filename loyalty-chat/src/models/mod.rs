//! Data models for chat entities.

mod form;
mod message;
mod metrics;
mod session;

pub use form::{
    ChatForm, FieldKind, FieldOption, FormCancellation, FormField, FormSubmission,
    ValidationRule,
};
pub use message::{
    cell_text, format_file_size, generate_id, Attachment, AttachmentKind, FileUpload, Message,
    Sender, TableData,
};
pub use metrics::{migrate_metrics, Metrics};
pub use session::Session;
