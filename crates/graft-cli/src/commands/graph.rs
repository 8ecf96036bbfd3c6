//! Handler for `graft graph`.

use std::path::Path;

use graft_core::lockfile::GraphLockFile;
use miette::Result;

use super::Session;
use crate::cli::ResolveArgs;

pub fn exec(
    args: &ResolveArgs,
    lockfile: Option<&Path>,
    build_requires: &[String],
    depth: Option<usize>,
) -> Result<()> {
    let lock = lockfile.map(GraphLockFile::from_path).transpose()?;
    let graph = Session::open(args)?.resolve(lock.as_ref(), build_requires)?;
    print!("{}", graph.print_tree(depth));
    Ok(())
}
