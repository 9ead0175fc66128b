//! Actor identity for audit events.
//!
//! Audited operations take the actor as an explicit argument. Callers that
//! carry identity in ambient context resolve it once at their boundary with
//! [`with_actor`] and read it back with [`current_actor`].

use std::future::Future;

use stowage_core::constants::SYSTEM_ACTOR;

tokio::task_local! {
    static ACTOR: String;
}

/// Normalize an optional caller-supplied identity; empty or missing is
/// [`SYSTEM_ACTOR`].
pub fn resolve_actor(actor: Option<&str>) -> String {
    match actor.map(str::trim) {
        Some(actor) if !actor.is_empty() => actor.to_string(),
        _ => SYSTEM_ACTOR.to_string(),
    }
}

/// Run `fut` with `actor` as the ambient identity.
pub async fn with_actor<F>(actor: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    let actor = actor.into();
    let actor = resolve_actor(Some(&actor));
    ACTOR.scope(actor, fut).await
}

/// Ambient identity of the current task, or [`SYSTEM_ACTOR`] outside
/// [`with_actor`].
pub fn current_actor() -> String {
    ACTOR
        .try_with(|actor| actor.clone())
        .unwrap_or_else(|_| SYSTEM_ACTOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_actor() {
        assert_eq!(resolve_actor(Some("alice")), "alice");
        assert_eq!(resolve_actor(Some("  ")), "system");
        assert_eq!(resolve_actor(None), "system");
    }

    #[tokio::test]
    async fn test_current_actor_scoped() {
        assert_eq!(current_actor(), "system");
        let inside = with_actor("bob", async { current_actor() }).await;
        assert_eq!(inside, "bob");
        let empty = with_actor("", async { current_actor() }).await;
        assert_eq!(empty, "system");
        assert_eq!(current_actor(), "system");
    }
}
