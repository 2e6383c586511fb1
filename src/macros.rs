// ============================================================================
// piglet - Macros
// ============================================================================

/// Clone handles into a `move` closure.
///
/// Hooks and setup functions are `'static` closures, so every `Rc` they
/// capture has to be cloned first. This collapses the clone block.
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use piglet::{cloned, ComponentDefinition, Runtime};
///
/// let rt = Runtime::default();
/// let mounts = Rc::new(RefCell::new(0));
///
/// rt.define(ComponentDefinition::new("Card").setup(cloned!(mounts => move |card| {
///     card.on_mount(cloned!(mounts => move |_, _| *mounts.borrow_mut() += 1));
/// })));
/// rt.mount("card-component").unwrap();
///
/// assert_eq!(*mounts.borrow(), 1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}
