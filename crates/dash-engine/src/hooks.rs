//! Command lifecycle hooks
//!
//! Hooks observe every command before its handler runs and after its
//! terminal event. The pipeline is fail-open: a failing hook is logged and
//! never affects the command.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::event::Event;
use crate::undo::CommandOrigin;

/// Context passed to hooks
#[derive(Debug, Clone)]
pub struct HookContext {
    pub correlation_id: String,
    /// Command type
    pub command: String,
    pub origin: CommandOrigin,
}

/// Result from hook execution
#[derive(Debug, Clone)]
pub struct HookResult {
    /// Whether the hook succeeded
    pub success: bool,
    /// Message describing what happened
    pub message: String,
}

impl HookResult {
    /// Create a success result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Create a failure result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Observer of command lifecycles
///
/// Implementations should handle their own errors and return failure
/// results rather than panicking.
#[async_trait]
pub trait CommandHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_start(&self, _context: &HookContext) -> HookResult {
        HookResult::success("")
    }

    async fn on_finish(&self, context: &HookContext, outcome: &Event) -> HookResult;
}

/// Hooks run in registration order
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<Box<dyn CommandHook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Box<dyn CommandHook>) {
        self.hooks.push(hook);
    }

    /// Run every `on_start` (fail-open)
    pub async fn run_start(&self, context: &HookContext) -> Vec<HookResult> {
        let mut results = Vec::with_capacity(self.hooks.len());
        for hook in &self.hooks {
            let result = hook.on_start(context).await;
            report(hook.name(), "start", context, &result);
            results.push(result);
        }
        results
    }

    /// Run every `on_finish` (fail-open)
    pub async fn run_finish(&self, context: &HookContext, outcome: &Event) -> Vec<HookResult> {
        let mut results = Vec::with_capacity(self.hooks.len());
        for hook in &self.hooks {
            let result = hook.on_finish(context, outcome).await;
            report(hook.name(), "finish", context, &result);
            results.push(result);
        }
        results
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

fn report(hook: &str, phase: &str, context: &HookContext, result: &HookResult) {
    if result.success {
        debug!("Hook {} {} for {} ok", hook, phase, context.correlation_id);
    } else {
        warn!(
            "Hook {} {} failed for {} (continuing): {}",
            hook, phase, context.correlation_id, result.message
        );
    }
}

/// Logs every terminal event at info level
pub struct AuditLogHook;

#[async_trait]
impl CommandHook for AuditLogHook {
    fn name(&self) -> &str {
        "audit-log"
    }

    async fn on_finish(&self, context: &HookContext, outcome: &Event) -> HookResult {
        info!(
            correlation_id = %context.correlation_id,
            origin = ?context.origin,
            "{} -> {}",
            context.command,
            outcome.kind()
        );
        HookResult::success(format!("logged {}", outcome.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingHook;

    #[async_trait]
    impl CommandHook for FailingHook {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_finish(&self, _context: &HookContext, _outcome: &Event) -> HookResult {
            HookResult::failure("disk full")
        }
    }

    struct CountingHook(Arc<AtomicUsize>);

    #[async_trait]
    impl CommandHook for CountingHook {
        fn name(&self) -> &str {
            "counting"
        }

        async fn on_start(&self, _context: &HookContext) -> HookResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            HookResult::success("started")
        }

        async fn on_finish(&self, _context: &HookContext, _outcome: &Event) -> HookResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            HookResult::success("finished")
        }
    }

    fn context() -> HookContext {
        HookContext {
            correlation_id: "c-1".into(),
            command: "renameDashboard".into(),
            origin: CommandOrigin::User,
        }
    }

    #[tokio::test]
    async fn test_pipeline_continues_after_failure() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pipeline = HookPipeline::new();
        pipeline.add_hook(Box::new(FailingHook));
        pipeline.add_hook(Box::new(CountingHook(counter.clone())));
        pipeline.add_hook(Box::new(AuditLogHook));
        assert_eq!(pipeline.len(), 3);

        let ctx = context();
        pipeline.run_start(&ctx).await;
        let event = Event::new("c-1", EventPayload::DashboardRenamed { title: "x".into() });
        let results = pipeline.run_finish(&ctx, &event).await;

        assert_eq!(results.len(), 3);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let pipeline = HookPipeline::default();
        assert!(pipeline.is_empty());
        assert!(pipeline.run_start(&context()).await.is_empty());
    }
}
