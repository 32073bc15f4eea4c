//! Built-in tools

mod chat;
mod echo;
mod review;

pub use chat::{CHAT, ChatTool};
pub use echo::{ECHO, EchoTool};
pub use review::{REVIEW, ReviewTool};

use conduit_application::ToolRegistry;
use std::sync::Arc;

/// Registry holding every built-in tool.
pub fn builtin_registry() -> ToolRegistry {
    ToolRegistry::new()
        .register_simple(Arc::new(EchoTool))
        .register_simple(Arc::new(ChatTool))
        .register_workflow(Arc::new(ReviewTool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry();
        let names: Vec<_> = registry.summaries().into_iter().map(|s| (s.name, s.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("chat".to_string(), "simple"),
                ("echo".to_string(), "simple"),
                ("review".to_string(), "workflow"),
            ]
        );
    }
}
