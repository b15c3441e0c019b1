//! Collaborator dispatch through the member table: `example.notifications`.
//!
//! `NotificationService` reaches its `EmailService` through [`CallContext::call`] rather than a
//! direct method call, which is what lets a table-patch mock on `EmailService.send` intercept it.

use std::sync::Mutex;

use babeltest_core::{
    Arg, CallArgs, CallContext, Constructor, Method, Param, ParamType, Raised, Receiver, Registry, Returned, TypeInfo,
};
use serde_json::{Value, json};

use crate::lock;

pub const EMAIL_SERVICE: &str = "example.notifications.EmailService";
pub const NOTIFICATION_SERVICE: &str = "example.notifications.NotificationService";

#[derive(Debug, Default)]
pub struct EmailService {
    outbox: Mutex<Vec<Value>>,
}

impl EmailService {
    pub fn send(&self, to: &str, subject: &str) -> Result<bool, Raised> {
        lock(&self.outbox)?.push(json!({"to": to, "subject": subject}));
        Ok(true)
    }

    pub fn sent_count(&self) -> Result<usize, Raised> {
        Ok(lock(&self.outbox)?.len())
    }
}

pub struct NotificationService {
    email: Receiver,
}

impl NotificationService {
    pub fn new(email: Receiver) -> Self {
        Self { email }
    }

    pub fn notify_user(&self, ctx: &CallContext, user_id: i64, message: &str) -> Result<Value, Raised> {
        let to = format!("user{user_id}@example.com");
        let args = CallArgs::new()
            .with("to", Arg::Str(to.clone()))
            .with("subject", Arg::Str(message.to_string()));
        let sent = ctx.call(&self.email, "send", args)?;
        Ok(json!({"to": to, "delivered": sent.value.as_bool().unwrap_or(false)}))
    }
}

pub fn register(registry: &mut Registry) {
    registry.insert(
        TypeInfo::class(EMAIL_SERVICE)
            .constructor(Constructor::new(|_| Ok(Receiver::new(EMAIL_SERVICE, EmailService::default()))))
            .method(
                Method::sync("send", |ctx, args| {
                    Ok(Returned::new(ctx.this::<EmailService>()?.send(args.str("to")?, args.str("subject")?)?))
                })
                .param(Param::new("to", ParamType::Str))
                .param(Param::new("subject", ParamType::Str))
                .returns(ParamType::Bool),
            )
            .method(
                Method::sync("sent_count", |ctx, _| {
                    Ok(Returned::new(ctx.this::<EmailService>()?.sent_count()? as u64))
                })
                .returns(ParamType::Int),
            ),
    );

    registry.insert(
        TypeInfo::class(NOTIFICATION_SERVICE)
            .constructor(Constructor::new(|_| {
                let email = Receiver::new(EMAIL_SERVICE, EmailService::default());
                Ok(Receiver::new(NOTIFICATION_SERVICE, NotificationService::new(email)))
            }))
            .method(
                Method::sync("notify_user", |ctx, args| {
                    let service = ctx.this::<NotificationService>()?;
                    Ok(Returned::new(service.notify_user(ctx, args.int("user_id")?, args.str("message")?)?))
                })
                .param(Param::new("user_id", ParamType::Int))
                .param(Param::new("message", ParamType::Str))
                .returns(ParamType::Map),
            ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_notify_dispatches_through_registry() {
        let mut registry = Registry::new();
        register(&mut registry);
        let email = Receiver::new(EMAIL_SERVICE, EmailService::default());
        let service = NotificationService::new(email.clone());
        let ctx = CallContext::new(None, Arc::new(registry));

        let result = service.notify_user(&ctx, 7, "hi").unwrap();
        assert_eq!(result, json!({"to": "user7@example.com", "delivered": true}));
        assert_eq!(email.downcast::<EmailService>().unwrap().sent_count().unwrap(), 1);
    }
}
