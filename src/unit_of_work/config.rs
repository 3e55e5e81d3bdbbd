/// Behaviour switches for a [`UnitOfWork`](super::UnitOfWork).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOfWorkConfig {
    /// Log every committed batch at `info` instead of `debug`.
    pub echo_commands: bool,

    /// Stop tracking entities once their DELETE has been committed.
    pub remove_deleted_on_commit: bool,
}

impl UnitOfWorkConfig {
    pub fn new() -> Self {
        Self {
            echo_commands: false,
            remove_deleted_on_commit: true,
        }
    }

    pub fn echo_commands(mut self, echo: bool) -> Self {
        self.echo_commands = echo;
        self
    }

    pub fn remove_deleted_on_commit(mut self, remove: bool) -> Self {
        self.remove_deleted_on_commit = remove;
        self
    }
}

impl Default for UnitOfWorkConfig {
    fn default() -> Self {
        Self::new()
    }
}
