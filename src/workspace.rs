use std::any::Any;
use std::cell::RefCell;
use std::thread::LocalKey;

/// A workspace that contains type-erased objects.
///
/// Holds per-thread scratch buffers reused across tabulation calls. Lookups are fastest when the
/// same type is requested many times in a row.
#[derive(Debug, Default)]
pub struct Workspace {
    workspaces: Vec<Box<dyn Any>>,
}

impl Workspace {
    pub fn get_or_insert_with<W, F>(&mut self, create: F) -> &mut W
    where
        W: 'static,
        F: FnOnce() -> W,
    {
        // The Vec is treated as a stack, most recently used entry last
        let idx = match self.workspaces.iter().rposition(|ws| ws.is::<W>()) {
            Some(idx) => idx,
            None => {
                self.workspaces.push(Box::new(create()) as Box<dyn Any>);
                self.workspaces.len() - 1
            }
        };

        let last = self.workspaces.len() - 1;
        self.workspaces.swap(idx, last);

        self.workspaces[last]
            .downcast_mut()
            .expect("Internal error: Downcasting can by definition not fail")
    }

    pub fn get_or_default<W>(&mut self) -> &mut W
    where
        W: 'static + Default,
    {
        self.get_or_insert_with(Default::default)
    }
}

/// Runs `f` with the workspace of type `W` stored in the given thread-local [`Workspace`].
pub fn with_thread_local_workspace<W, R>(
    workspace: &'static LocalKey<RefCell<Workspace>>,
    f: impl FnOnce(&mut W) -> R,
) -> R
where
    W: 'static + Default,
{
    workspace.with(|refcell| {
        let mut workspace = refcell.borrow_mut();
        f(workspace.get_or_default())
    })
}
