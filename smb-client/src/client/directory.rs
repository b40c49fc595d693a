//! Recursive delete and move over a connected share, written with an
//! explicit work stack so arbitrarily deep trees cannot overflow the
//! call stack.

use tokio_util::sync::CancellationToken;

use smb_client_core::error::SMBError;
use smb_client_core::logging::debug;
use smb_client_core::SMBResult;

use crate::client::file_store::{SMBFileHandle, SMBFileStore};
use crate::protocol::body::{
    CreateDisposition, CreateOptions, FileAttributes, FileInformationClass,
    FileRenameInformation, ShareAccess,
};

const DELETE: u32 = 0x0001_0000;
const FILE_LIST_DIRECTORY: u32 = 0x0000_0001;

/// What to do when one entry in a tree walk fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkErrorPolicy {
    /// Abort the walk, surfacing the first failure as the result.
    StopOnFirstError,
    /// Press on; every failure is collected and reported at the end.
    ContinueOnError,
}

/// One entry the walk could not process.
#[derive(Debug)]
pub struct WalkFailure {
    pub path: String,
    pub error: SMBError,
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", parent.trim_end_matches('\\'), name)
    }
}

async fn open_for_delete<S: SMBFileStore>(
    store: &S,
    path: &str,
    directory: bool,
    cancel: &CancellationToken,
) -> SMBResult<SMBFileHandle> {
    let options = if directory {
        CreateOptions::DIRECTORY_FILE | CreateOptions::DELETE_ON_CLOSE
    } else {
        CreateOptions::NON_DIRECTORY_FILE | CreateOptions::DELETE_ON_CLOSE
    };
    store
        .create(
            path,
            DELETE,
            FileAttributes::empty(),
            ShareAccess::DELETE,
            CreateDisposition::Open,
            options,
            cancel,
        )
        .await
}

async fn delete_entry<S: SMBFileStore>(
    store: &S,
    path: &str,
    directory: bool,
    cancel: &CancellationToken,
) -> SMBResult<()> {
    let handle = open_for_delete(store, path, directory, cancel).await?;
    store.close(&handle, cancel).await
}

async fn list_directory<S: SMBFileStore>(
    store: &S,
    path: &str,
    cancel: &CancellationToken,
) -> SMBResult<Vec<crate::protocol::body::FileDirectoryInformation>> {
    let handle = store
        .create(
            path,
            FILE_LIST_DIRECTORY,
            FileAttributes::empty(),
            ShareAccess::READ | ShareAccess::WRITE | ShareAccess::DELETE,
            CreateDisposition::Open,
            CreateOptions::DIRECTORY_FILE,
            cancel,
        )
        .await?;
    let listing = store.query_directory(&handle, "*", cancel).await;
    // close even when the listing failed
    let closed = store.close(&handle, cancel).await;
    let entries = listing?;
    closed?;
    Ok(entries)
}

/// Deletes `path` and everything beneath it. Directories are removed
/// after their contents, driven by a two-phase traversal: discover all
/// directories pre-order while deleting plain files on the spot, then
/// remove the directories in reverse discovery order.
pub async fn delete_directory_tree<S: SMBFileStore + Sync>(
    store: &S,
    path: &str,
    policy: WalkErrorPolicy,
    cancel: &CancellationToken,
) -> SMBResult<Vec<WalkFailure>> {
    let mut failures = Vec::new();
    let mut pending = vec![path.to_string()];
    let mut discovered = Vec::new();

    while let Some(directory) = pending.pop() {
        let entries = match list_directory(store, &directory, cancel).await {
            Ok(entries) => entries,
            Err(error) => {
                match policy {
                    WalkErrorPolicy::StopOnFirstError => return Err(error),
                    WalkErrorPolicy::ContinueOnError => {
                        failures.push(WalkFailure {
                            path: directory.clone(),
                            error,
                        });
                        continue;
                    }
                }
            }
        };
        discovered.push(directory.clone());
        for entry in entries {
            if entry.file_name == "." || entry.file_name == ".." {
                continue;
            }
            let child = join(&directory, &entry.file_name);
            if entry.is_directory() {
                pending.push(child);
            } else if let Err(error) = delete_entry(store, &child, false, cancel).await {
                match policy {
                    WalkErrorPolicy::StopOnFirstError => return Err(error),
                    WalkErrorPolicy::ContinueOnError => {
                        failures.push(WalkFailure { path: child, error })
                    }
                }
            }
        }
    }

    for directory in discovered.into_iter().rev() {
        if let Err(error) = delete_entry(store, &directory, true, cancel).await {
            match policy {
                WalkErrorPolicy::StopOnFirstError => return Err(error),
                WalkErrorPolicy::ContinueOnError => failures.push(WalkFailure {
                    path: directory,
                    error,
                }),
            }
        }
    }
    debug!(failures = failures.len(), "directory tree deleted");
    Ok(failures)
}

/// Renames `source` to `destination` within the share. A rename moves
/// a whole directory tree server-side, so no walk is needed.
pub async fn move_entry<S: SMBFileStore>(
    store: &S,
    source: &str,
    destination: &str,
    replace_if_exists: bool,
    cancel: &CancellationToken,
) -> SMBResult<()> {
    let handle = store
        .create(
            source,
            DELETE,
            FileAttributes::empty(),
            ShareAccess::READ | ShareAccess::WRITE | ShareAccess::DELETE,
            CreateDisposition::Open,
            CreateOptions::empty(),
            cancel,
        )
        .await?;
    let rename = FileRenameInformation {
        replace_if_exists,
        file_name: destination.to_string(),
    };
    let renamed = store
        .set_info(
            &handle,
            FileInformationClass::RenameInformation,
            rename.encode(),
            cancel,
        )
        .await;
    let closed = store.close(&handle, cancel).await;
    renamed?;
    closed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_trailing_separators() {
        assert_eq!(join("dir\\", "file.txt"), "dir\\file.txt");
        assert_eq!(join("dir", "sub"), "dir\\sub");
        assert_eq!(join("", "top"), "top");
    }
}
