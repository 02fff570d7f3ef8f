// Built-in script libraries

pub mod coroutine;
pub mod thread;

use std::sync::Arc;

use tracing::debug;

use crate::lib_registry::create_standard_registry;
use crate::sable_vm::Context;

/// Install every built-in library into `context`.
pub fn open_libs(context: &Arc<Context>) {
    let registry = create_standard_registry();
    registry.load_all(context);
    debug!("opened built-in libraries");
}
