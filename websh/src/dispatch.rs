//! Callback dispatch.
//!
//! A capability operation never returns its result. It takes a script
//! function, builds the payload through the value bridge, and calls the
//! function before the operation itself returns. Nothing is queued; a
//! capability called from inside a callback is an ordinary nested call, and
//! an exception thrown by the callback reaches the operation's caller as-is.

use crate::bridge::{self, BridgedValue};
use crate::error::CapabilityError;
use rquickjs::function::This;
use rquickjs::{Ctx, Function, Value};
use tracing::trace;

/// Fail with `ArityError` unless exactly `expected` arguments were passed.
pub fn expect_arity(op: &'static str, args: &[Value<'_>], expected: usize) -> Result<(), CapabilityError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CapabilityError::Arity {
            op,
            expected,
            got: args.len(),
        })
    }
}

/// Take `value` as a completion function.
pub fn expect_function<'js>(
    op: &'static str,
    role: &str,
    value: &Value<'js>,
) -> Result<Function<'js>, CapabilityError> {
    value
        .clone()
        .into_function()
        .ok_or_else(|| bridge::mismatch(&format!("{op}: {role}"), value, "function"))
}

/// A completion function bound to the operation that will invoke it.
pub struct Completion<'js> {
    op: &'static str,
    callback: Function<'js>,
    this: Option<Value<'js>>,
}

impl<'js> Completion<'js> {
    pub fn new(op: &'static str, callback: Function<'js>) -> Self {
        Self {
            op,
            callback,
            this: None,
        }
    }

    /// Invoke the callback with `this` bound to `receiver`.
    pub fn with_this(mut self, receiver: Value<'js>) -> Self {
        self.this = Some(receiver);
        self
    }

    /// Deliver a bridged payload as the single callback argument.
    pub fn deliver(self, ctx: &Ctx<'js>, payload: &BridgedValue) -> Result<(), CapabilityError> {
        let value = bridge::to_engine(ctx, payload)?;
        self.deliver_value(ctx, value)
    }

    /// Deliver an already built engine value as the single callback argument.
    pub fn deliver_value(self, ctx: &Ctx<'js>, payload: Value<'js>) -> Result<(), CapabilityError> {
        trace!(op = self.op, "invoking completion");
        let this = self
            .this
            .unwrap_or_else(|| Value::new_undefined(ctx.clone()));
        self.callback.call::<_, Value>((This(this), payload))?;
        Ok(())
    }
}
