//! Stateful services: `example.services`.

use std::sync::Mutex;

use babeltest_core::{Builder, Constructor, Method, Param, ParamType, Raised, Receiver, Registry, Returned, TypeInfo};
use serde::Serialize;

use crate::lock;

pub const USER_SERVICE: &str = "example.services.UserService";
pub const CALCULATOR: &str = "example.services.Calculator";
pub const GREETER: &str = "example.services.Greeter";
pub const AUDIT_LOG: &str = "example.services.AuditLog";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub active: bool,
}

/// In-memory user store seeded with two users.
#[derive(Debug)]
pub struct UserService {
    users: Mutex<Vec<User>>,
}

impl Default for UserService {
    fn default() -> Self {
        Self {
            users: Mutex::new(vec![
                User {
                    id: 1,
                    name: "Kohl".into(),
                    email: "kohl@example.com".into(),
                    active: true,
                },
                User {
                    id: 2,
                    name: "Alice".into(),
                    email: "alice@example.com".into(),
                    active: true,
                },
            ]),
        }
    }
}

impl UserService {
    pub fn get_by_id(&self, id: i64) -> Result<Option<User>, Raised> {
        Ok(lock(&self.users)?.iter().find(|u| u.id == id).cloned())
    }

    pub fn create(&self, name: &str, email: &str) -> Result<User, Raised> {
        let mut users = lock(&self.users)?;
        let user = User {
            id: users.len() as i64 + 1,
            name: name.to_string(),
            email: email.to_string(),
            active: true,
        };
        users.push(user.clone());
        Ok(user)
    }

    pub fn deactivate(&self, id: i64) -> Result<bool, Raised> {
        let mut users = lock(&self.users)?;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct Calculator;

impl Calculator {
    pub fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    pub fn multiply(&self, a: i64, b: i64) -> i64 {
        a * b
    }
}

/// Needs a greeting to construct; tests obtain one through `test_factory`.
#[derive(Debug)]
pub struct Greeter {
    greeting: String,
}

impl Greeter {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }

    pub fn greet(&self, name: &str) -> String {
        format!("{}, {name}!", self.greeting)
    }
}

/// Only constructible from a factory file (its prefix has no default).
#[derive(Debug)]
pub struct AuditLog {
    prefix: String,
    entries: Mutex<Vec<String>>,
}

impl AuditLog {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, entry: &str) -> Result<String, Raised> {
        let line = format!("{} {entry}", self.prefix);
        lock(&self.entries)?.push(line.clone());
        Ok(line)
    }

    pub fn entries(&self) -> Result<Vec<String>, Raised> {
        Ok(lock(&self.entries)?.clone())
    }
}

fn user_or_null(user: Option<User>) -> Result<Returned, Raised> {
    match user {
        Some(user) => Returned::typed("User", &user),
        None => Ok(Returned::null()),
    }
}

fn register_user_service(registry: &mut Registry) {
    registry.insert(
        TypeInfo::class(USER_SERVICE)
            .constructor(Constructor::new(|_| Ok(Receiver::new(USER_SERVICE, UserService::default()))))
            .method(
                Method::sync("get_by_id", |ctx, args| {
                    user_or_null(ctx.this::<UserService>()?.get_by_id(args.int("id")?)?)
                })
                .param(Param::new("id", ParamType::Int))
                .returns(ParamType::optional(ParamType::record("User"))),
            )
            .method(
                Method::sync("create", |ctx, args| {
                    let user = ctx.this::<UserService>()?.create(args.str("name")?, args.str("email")?)?;
                    Returned::typed("User", &user)
                })
                .param(Param::new("name", ParamType::Str))
                .param(Param::new("email", ParamType::Str))
                .returns(ParamType::record("User")),
            )
            .method(
                Method::sync("deactivate", |ctx, args| {
                    Ok(Returned::new(ctx.this::<UserService>()?.deactivate(args.int("id")?)?))
                })
                .param(Param::new("id", ParamType::Int))
                .returns(ParamType::Bool),
            ),
    );
}

fn register_calculator(registry: &mut Registry) {
    registry.insert(
        TypeInfo::class(CALCULATOR)
            .constructor(Constructor::new(|_| Ok(Receiver::new(CALCULATOR, Calculator))))
            .method(
                Method::sync("add", |ctx, args| {
                    Ok(Returned::new(ctx.this::<Calculator>()?.add(args.int("a")?, args.int("b")?)))
                })
                .param(Param::new("a", ParamType::Int))
                .param(Param::new("b", ParamType::Int))
                .returns(ParamType::Int),
            )
            .method(
                Method::sync("multiply", |ctx, args| {
                    Ok(Returned::new(ctx.this::<Calculator>()?.multiply(args.int("a")?, args.int("b")?)))
                })
                .param(Param::new("a", ParamType::Int))
                .param(Param::new("b", ParamType::Int))
                .returns(ParamType::Int),
            ),
    );
}

fn register_greeter(registry: &mut Registry) {
    registry.insert(
        TypeInfo::class(GREETER)
            .constructor(
                Constructor::new(|args| Ok(Receiver::new(GREETER, Greeter::new(args.string("greeting")?))))
                    .param(Param::new("greeting", ParamType::Str)),
            )
            .test_factory(Builder::sync(|| Ok(Receiver::new(GREETER, Greeter::new("Hello")))))
            .method(
                Method::sync("greet", |ctx, args| {
                    Ok(Returned::new(ctx.this::<Greeter>()?.greet(args.str("name")?)))
                })
                .param(Param::new("name", ParamType::Str))
                .returns(ParamType::Str),
            ),
    );
}

fn register_audit_log(registry: &mut Registry) {
    registry.insert(
        TypeInfo::class(AUDIT_LOG)
            .constructor(
                Constructor::new(|args| Ok(Receiver::new(AUDIT_LOG, AuditLog::new(args.string("prefix")?))))
                    .param(Param::new("prefix", ParamType::Str)),
            )
            .method(
                Method::sync("record", |ctx, args| {
                    Ok(Returned::new(ctx.this::<AuditLog>()?.record(args.str("entry")?)?))
                })
                .param(Param::new("entry", ParamType::Str))
                .returns(ParamType::Str),
            )
            .method(
                Method::sync("entries", |ctx, _| Returned::json(&ctx.this::<AuditLog>()?.entries()?))
                    .returns(ParamType::list(ParamType::Str)),
            ),
    );
}

pub fn register(registry: &mut Registry) {
    register_user_service(registry);
    register_calculator(registry);
    register_greeter(registry);
    register_audit_log(registry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_service_round_trip() {
        let service = UserService::default();
        assert_eq!(service.get_by_id(1).unwrap().unwrap().name, "Kohl");
        assert!(service.get_by_id(999).unwrap().is_none());

        let created = service.create("Bob", "bob@example.com").unwrap();
        assert_eq!(created.id, 3);
        assert!(service.deactivate(3).unwrap());
        assert!(!service.get_by_id(3).unwrap().unwrap().active);
        assert!(!service.deactivate(42).unwrap());
    }

    #[test]
    fn test_greeter_and_audit_log() {
        assert_eq!(Greeter::new("Hello").greet("Kohl"), "Hello, Kohl!");
        let log = AuditLog::new("[audit]");
        assert_eq!(log.record("login").unwrap(), "[audit] login");
        assert_eq!(log.entries().unwrap(), vec!["[audit] login".to_string()]);
    }
}
