//! Domain models.

pub mod field;
pub mod form;
pub mod record;
pub mod response;

pub use field::{Field, FieldInput, FieldOption, FieldProperties, FieldType, OptionInput};
pub use form::{Form, FormDraft, FormPatch, FormSettings};
pub use response::{Answers, FormResponse, SubmitReceipt};
