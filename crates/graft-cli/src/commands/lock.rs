//! Handler for `graft lock`.

use std::path::Path;

use graft_resolver::lock::capture_lock;
use miette::Result;

use super::Session;
use crate::cli::ResolveArgs;

pub fn exec(args: &ResolveArgs, output: &Path) -> Result<()> {
    let graph = Session::open(args)?.resolve(None, &[])?;
    let lock = capture_lock(&graph);
    lock.write(output)?;
    println!("Wrote {} ({} nodes)", output.display(), lock.nodes.len());
    Ok(())
}
