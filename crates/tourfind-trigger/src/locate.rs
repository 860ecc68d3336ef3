//! Element lookup and activation against the host scene graph.

use tracing::debug;

use tourfind_core::host::try_call;
use tourfind_core::{CallOutcome, HostObject, HostRef, HostValue, TourHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// `player.getById(id)`
    PlayerById,
    /// `get(id)` on the tour root, then on the player
    GenericGet,
    /// `getAllIDs()` membership, then `getById(id)` on the root
    IdEnumeration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMethod {
    /// `trigger("click")`
    Trigger,
    Click,
    OnClick,
}

impl ActivationMethod {
    pub const ORDER: [Self; 3] = [Self::Trigger, Self::Click, Self::OnClick];

    pub fn method_name(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Click => "click",
            Self::OnClick => "onClick",
        }
    }

    fn args(self) -> Vec<HostValue> {
        match self {
            Self::Trigger => vec![HostValue::from("click")],
            Self::Click | Self::OnClick => Vec::new(),
        }
    }
}

/// Find `element_id`, trying each lookup strategy in order.
pub fn locate(tour: &dyn TourHandle, element_id: &str) -> Option<(LookupStrategy, HostRef)> {
    let player = tour.player();
    let root = tour.root();
    let id = [HostValue::from(element_id)];
    let object = |value: HostValue| value.as_object().cloned();

    if let Some(found) = player.as_deref().and_then(|p| try_call(p, "getById", &id)).and_then(object) {
        return Some((LookupStrategy::PlayerById, found));
    }

    let generic = try_call(root.as_ref(), "get", &id)
        .and_then(object)
        .or_else(|| player.as_deref().and_then(|p| try_call(p, "get", &id)).and_then(object));
    if let Some(found) = generic {
        return Some((LookupStrategy::GenericGet, found));
    }

    let known = player
        .as_deref()
        .and_then(|p| try_call(p, "getAllIDs", &[]))
        .or_else(|| try_call(root.as_ref(), "getAllIDs", &[]))
        .is_some_and(|ids| ids.string_list().iter().any(|known| known == element_id));
    if known {
        if let Some(found) = try_call(root.as_ref(), "getById", &id).and_then(object) {
            return Some((LookupStrategy::IdEnumeration, found));
        }
    }
    None
}

/// Activate `element` with the first method that exists and does not throw.
pub fn activate(element: &dyn HostObject) -> Option<ActivationMethod> {
    ActivationMethod::ORDER.into_iter().find(|method| {
        match element.call(method.method_name(), &method.args()) {
            CallOutcome::Returned(_) => true,
            CallOutcome::Missing => false,
            CallOutcome::Threw(message) => {
                debug!(method = method.method_name(), %message, "activation threw");
                false
            }
        }
    })
}
