//! Process-wide script engine runtime.
//!
//! One [`Engine`] is initialized before the command loop starts and shut
//! down after it ends. Sessions borrow it, so no engine state can be touched
//! outside that window.

use crate::error::{WebshError, WebshResult};
use rquickjs::{qjs, Context, Ctx, Runtime, Value};
use std::ffi::CString;
use tracing::{debug, info};
use websh_config::EngineConfig;

pub struct Engine {
    runtime: Runtime,
}

impl Engine {
    pub fn init(config: &EngineConfig) -> WebshResult<Self> {
        let runtime = Runtime::new().map_err(|e| WebshError::EngineInit(e.to_string()))?;

        if config.memory_limit_bytes > 0 {
            runtime.set_memory_limit(config.memory_limit_bytes);
        }
        if config.max_stack_size_bytes > 0 {
            runtime.set_max_stack_size(config.max_stack_size_bytes);
        }
        if config.gc_threshold_bytes > 0 {
            runtime.set_gc_threshold(config.gc_threshold_bytes);
        }

        info!(
            memory_limit = config.memory_limit_bytes,
            max_stack_size = config.max_stack_size_bytes,
            "script engine initialized"
        );
        Ok(Self { runtime })
    }

    /// A fresh, empty execution context with the standard intrinsics.
    pub fn new_context(&self) -> rquickjs::Result<Context> {
        Context::full(&self.runtime)
    }

    pub fn shutdown(self) {
        self.runtime.run_gc();
        debug!("script engine shut down");
    }
}

/// A script parsed to bytecode whose top-level statements have not run.
pub struct CompiledScript<'js> {
    bytecode: Value<'js>,
}

impl<'js> CompiledScript<'js> {
    /// Parse `source` as global script code. Nothing in it executes.
    #[allow(unsafe_code)]
    pub fn compile(ctx: &Ctx<'js>, file_name: &str, source: &str) -> rquickjs::Result<Self> {
        let file_name = CString::new(file_name)?;
        let input = CString::new(source)?;
        let flags = qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_STRICT | qjs::JS_EVAL_FLAG_COMPILE_ONLY;

        // SAFETY: `input` is NUL-terminated and outlives the call, and the
        // returned value is owned by us.
        let raw = unsafe {
            qjs::JS_Eval(
                ctx.as_raw().as_ptr(),
                input.as_ptr(),
                input.as_bytes().len() as _,
                file_name.as_ptr(),
                flags as i32,
            )
        };
        if unsafe { qjs::JS_IsException(raw) } {
            return Err(rquickjs::Error::Exception);
        }
        // SAFETY: `raw` is an owned value of this context's runtime.
        let bytecode = unsafe { Value::from_raw(ctx.clone(), raw) };
        Ok(Self { bytecode })
    }

    /// Execute the top-level statements in the global scope.
    #[allow(unsafe_code)]
    pub fn run(self) -> rquickjs::Result<Value<'js>> {
        let ctx = self.bytecode.ctx().clone();
        let raw_ctx = ctx.as_raw().as_ptr();

        // SAFETY: JS_EvalFunction consumes its argument, so it gets its own
        // reference and `self.bytecode` still releases the original.
        let raw = unsafe {
            let function = qjs::JS_DupValue(raw_ctx, self.bytecode.as_raw());
            qjs::JS_EvalFunction(raw_ctx, function)
        };
        if unsafe { qjs::JS_IsException(raw) } {
            return Err(rquickjs::Error::Exception);
        }
        // SAFETY: the completion value is owned by us.
        Ok(unsafe { Value::from_raw(ctx, raw) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_do_not_share_globals() {
        let engine = Engine::init(&EngineConfig::default()).unwrap();

        let first = engine.new_context().unwrap();
        first.with(|ctx| {
            ctx.eval::<rquickjs::Value, _>("globalThis.leftover = 1;").unwrap();
        });
        drop(first);

        let second = engine.new_context().unwrap();
        let kind: String = second.with(|ctx| ctx.eval("typeof leftover").unwrap());
        assert_eq!(kind, "undefined");

        drop(second);
        engine.shutdown();
    }

    #[test]
    fn compiling_runs_nothing() {
        let engine = Engine::init(&EngineConfig::default()).unwrap();
        let context = engine.new_context().unwrap();
        context.with(|ctx| {
            let compiled = CompiledScript::compile(&ctx, "count.js", "globalThis.hits = (globalThis.hits || 0) + 1;").unwrap();
            let kind: String = ctx.eval("typeof hits").unwrap();
            assert_eq!(kind, "undefined");

            compiled.run().unwrap();
            let hits: i32 = ctx.globals().get("hits").unwrap();
            assert_eq!(hits, 1);
        });
    }

    #[test]
    fn compile_reports_syntax_errors_as_exceptions() {
        let engine = Engine::init(&EngineConfig::default()).unwrap();
        let context = engine.new_context().unwrap();
        context.with(|ctx| {
            let err = CompiledScript::compile(&ctx, "bad.js", "function main( {").err();
            assert!(matches!(err, Some(rquickjs::Error::Exception)));
            let message: String = ctx.catch().get::<rquickjs::Coerced<String>>().unwrap().0;
            assert!(message.starts_with("SyntaxError"), "{message}");
        });
    }

    #[test]
    fn stack_limit_is_applied() {
        let config = EngineConfig {
            max_stack_size_bytes: 256 * 1024,
            ..EngineConfig::default()
        };
        let engine = Engine::init(&config).unwrap();
        let context = engine.new_context().unwrap();
        let overflowed = context.with(|ctx| {
            ctx.eval::<rquickjs::Value, _>("function f() { return f() + 1; } f();")
                .is_err()
        });
        assert!(overflowed);
    }
}
