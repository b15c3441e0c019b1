//! Deeply nested return values for `contains` checks: `example.nested`.

use babeltest_core::{Method, ParamType, Registry, Returned, TypeInfo};
use serde::Serialize;
use serde_json::{Value, json};

pub const PATH: &str = "example.nested";

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub bio: String,
    pub address: Address,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub profile: Profile,
}

pub fn get_user_with_profile() -> User {
    User {
        id: 1,
        name: "Kohl".into(),
        profile: Profile {
            bio: "Builder of things".into(),
            address: Address {
                street: "123 Main St".into(),
                city: "Portland".into(),
                country: "USA".into(),
            },
            tags: vec!["developer".into(), "architect".into(), "writer".into()],
        },
    }
}

pub fn get_nested_dict() -> Value {
    json!({
        "level1": {
            "level2": {
                "level3": {
                    "value": 42,
                    "items": ["a", "b", "c"]
                }
            }
        },
        "metadata": {
            "version": "1.0",
            "features": [
                {"name": "feature1", "enabled": true},
                {"name": "feature2", "enabled": false}
            ]
        }
    })
}

pub fn get_list_of_users() -> Value {
    json!([
        {"id": 1, "name": "Alice", "role": "admin"},
        {"id": 2, "name": "Bob", "role": "user"},
        {"id": 3, "name": "Charlie", "role": "user"},
    ])
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::module(PATH)
            .method(
                Method::sync("get_user_with_profile", |_, _| Returned::typed("User", &get_user_with_profile()))
                    .returns(ParamType::record("User"))
                    .static_member(),
            )
            .method(
                Method::sync("get_nested_dict", |_, _| Ok(Returned::new(get_nested_dict())))
                    .returns(ParamType::Map)
                    .static_member(),
            )
            .method(
                Method::sync("get_list_of_users", |_, _| Ok(Returned::new(get_list_of_users())))
                    .returns(ParamType::list(ParamType::Map))
                    .static_member(),
            ),
    );
}
