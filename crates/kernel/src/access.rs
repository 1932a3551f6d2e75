//! Access policy for forms and responses.
//!
//! Pure predicates over a resource and the caller's user id (`None` for
//! anonymous callers). No I/O.

use uuid::Uuid;

use crate::models::Form;
use crate::models::record::{FormRecord, ResponseRecord};

/// The ownership facts access decisions need from a form.
pub trait FormAccess {
    fn owner_id(&self) -> Uuid;
    fn is_public(&self) -> bool;
}

impl FormAccess for Form {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn is_public(&self) -> bool {
        self.is_public
    }
}

impl FormAccess for FormRecord {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn is_public(&self) -> bool {
        self.is_public
    }
}

fn is_owner(owner: Uuid, caller: Option<Uuid>) -> bool {
    caller == Some(owner)
}

/// Public forms are visible to everyone, private forms only to their owner.
pub fn can_view_form(form: &impl FormAccess, caller: Option<Uuid>) -> bool {
    form.is_public() || is_owner(form.owner_id(), caller)
}

/// Only the owner may change or delete a form.
pub fn can_mutate_form(form: &impl FormAccess, caller: Option<Uuid>) -> bool {
    is_owner(form.owner_id(), caller)
}

/// Public forms accept submissions from anyone, private forms only from
/// their owner.
pub fn can_submit_response(form: &impl FormAccess, caller: Option<Uuid>) -> bool {
    can_view_form(form, caller)
}

/// A response is visible to the form owner and to its submitter.
///
/// Anonymous callers never see a response, even one submitted anonymously.
pub fn can_view_response(
    response: &ResponseRecord,
    form_owner: Uuid,
    caller: Option<Uuid>,
) -> bool {
    match caller {
        None => false,
        Some(_) => is_owner(form_owner, caller) || response.user_id == caller,
    }
}

/// Only the form owner may manage a form's responses.
pub fn can_mutate_response(form_owner: Uuid, caller: Option<Uuid>) -> bool {
    is_owner(form_owner, caller)
}

/// The form owner and the original submitter may delete a response.
pub fn can_delete_response(
    response: &ResponseRecord,
    form_owner: Uuid,
    caller: Option<Uuid>,
) -> bool {
    caller.is_some() && (can_mutate_response(form_owner, caller) || response.user_id == caller)
}
