//! Property navigation: `example.container`.

use babeltest_core::{Constructor, Property, Raised, Receiver, Registry, TypeInfo};

use crate::services::{CALCULATOR, Calculator, USER_SERVICE, UserService};

pub const APP_CONTAINER: &str = "example.container.AppContainer";

/// Holds long-lived services; tests reach them as `AppContainer.users.get_by_id`.
pub struct AppContainer {
    users: Receiver,
    calculator: Receiver,
}

impl Default for AppContainer {
    fn default() -> Self {
        Self {
            users: Receiver::new(USER_SERVICE, UserService::default()),
            calculator: Receiver::new(CALCULATOR, Calculator),
        }
    }
}

fn container(receiver: &Receiver) -> Result<&AppContainer, Raised> {
    receiver
        .downcast::<AppContainer>()
        .ok_or_else(|| Raised::type_error(format!("{} is not an AppContainer", receiver.type_path)))
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::class(APP_CONTAINER)
            .constructor(Constructor::new(|_| Ok(Receiver::new(APP_CONTAINER, AppContainer::default()))))
            .property(Property::new("users", USER_SERVICE, |r| Ok(container(r)?.users.clone())))
            .property(Property::new("calculator", CALCULATOR, |r| Ok(container(r)?.calculator.clone()))),
    );
}
