use std::any::Any;
use std::fmt;

/// Caller-supplied value passed untouched to role resolvers and assertions.
///
/// The engine never inspects it. Assertions that expect a concrete type
/// recover it with [`Context::downcast_ref`]; anything else reads as absent.
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    value: Option<&'a (dyn Any + 'static)>,
}

impl<'a> Context<'a> {
    /// A context carrying no value
    #[must_use]
    pub fn none() -> Self {
        Self { value: None }
    }

    #[must_use]
    pub fn new<T: Any>(value: &'a T) -> Self {
        Self { value: Some(value) }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Borrow the value as `T` if one was supplied and has that type
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.value.and_then(<dyn Any>::downcast_ref::<T>)
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("present", &self.value.is_some())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct Document {
        owner: &'static str,
    }

    #[test]
    fn test_none_context() {
        let ctx = Context::none();
        assert!(ctx.is_none());
        assert!(ctx.downcast_ref::<Document>().is_none());
    }

    #[test]
    fn test_downcast_matching_type() {
        let doc = Document { owner: "alice" };
        let ctx = Context::new(&doc);
        assert!(!ctx.is_none());
        let owner = ctx.downcast_ref::<Document>().map(|d| d.owner);
        assert_eq!(owner, Some("alice"));
    }

    #[test]
    fn test_downcast_other_type_is_absent() {
        let value = 42_u32;
        let ctx = Context::new(&value);
        assert!(ctx.downcast_ref::<Document>().is_none());
        assert_eq!(ctx.downcast_ref::<u32>(), Some(&42));
    }
}
