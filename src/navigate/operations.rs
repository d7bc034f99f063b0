//! Navigate operations
//!
//! Directory changes with on-demand creation, and the rename orchestration
//! that recovers from existing targets and missing target directories.

use log::{debug, info};

use crate::client::ControlSession;
use crate::error::{FtpClientError, FtpResult};
use crate::protocol::Command;
use crate::protocol::Reply;
use crate::protocol::classify::{self, CdOutcome, RenameStep};
use crate::protocol::responses::{FILE_ACTION_OK, OK, PATH_CREATED};

/// Result of one RNFR/RNTO exchange that got replies for every step it sent.
enum RenameAttempt {
    Renamed,
    SourceRefused(Reply),
    TargetRefused(Reply),
}

impl ControlSession {
    /// Changes the working directory. An empty `dir` means the home directory.
    ///
    /// With `create`, a 550 starts a walk over the path components: each is
    /// tried with CWD and, when that fails, created with MKD and entered.
    pub fn cd(&mut self, dir: &str, create: bool) -> FtpResult<()> {
        let target = if dir.is_empty() { "~" } else { dir };
        let reply = self.command(&Command::Cwd(target))?;

        match classify::classify_cd(&reply, create && !dir.is_empty()) {
            CdOutcome::Ok => Ok(()),
            CdOutcome::NeedsCreate => self.create_path(dir),
            CdOutcome::Denied(code) => {
                debug!("CWD {target} refused with {code}");
                Err(FtpClientError::UnexpectedReply(reply))
            }
        }
    }

    fn create_path(&mut self, dir: &str) -> FtpResult<()> {
        for component in path_components(dir) {
            let reply = self.command(&Command::Cwd(&component))?;
            if classify::is_completed(&reply) {
                continue;
            }
            self.expect(&Command::Mkd(&component), &[PATH_CREATED])?;
            self.expect(&Command::Cwd(&component), &[FILE_ACTION_OK, OK])?;
            debug!("Created remote directory {component}");
        }
        info!("Created remote directory path {dir}");
        Ok(())
    }

    /// Renames `from` to `to`.
    ///
    /// `fast` pipelines RNFR and RNTO in a single write. When RNTO is refused
    /// the target is deleted and the rename retried once. When the target
    /// directory is missing and `create_dir` is set, it is created and the
    /// rename tried a final time. Every other failure is returned as is.
    pub fn move_file(&mut self, from: &str, to: &str, fast: bool, create_dir: bool) -> FtpResult<()> {
        let refused = match self.try_rename(from, to, fast)? {
            RenameAttempt::Renamed => return Ok(()),
            RenameAttempt::SourceRefused(reply) => {
                return Err(FtpClientError::UnexpectedReply(reply));
            }
            RenameAttempt::TargetRefused(reply) => reply,
        };

        debug!("RNTO {to} refused ({}), deleting target", refused.code());
        let missing_dir = match self.delete(to) {
            Ok(()) => match self.try_rename(from, to, false)? {
                RenameAttempt::Renamed => return Ok(()),
                RenameAttempt::TargetRefused(reply)
                    if create_dir && classify::classify_rnto(&reply) == RenameStep::MissingDirectory =>
                {
                    reply
                }
                RenameAttempt::SourceRefused(reply) | RenameAttempt::TargetRefused(reply) => {
                    return Err(FtpClientError::UnexpectedReply(reply));
                }
            },
            Err(FtpClientError::UnexpectedReply(_))
                if create_dir && classify::classify_rnto(&refused) == RenameStep::MissingDirectory =>
            {
                refused
            }
            Err(FtpClientError::UnexpectedReply(_)) => {
                return Err(FtpClientError::UnexpectedReply(refused));
            }
            Err(e) => return Err(e),
        };

        let Some(parent) = parent_directory(to) else {
            return Err(FtpClientError::UnexpectedReply(missing_dir));
        };
        info!("Target directory {parent} missing, creating it");
        let current = self.pwd()?;
        self.cd(parent, true)?;
        self.cd(&current, false)?;

        match self.try_rename(from, to, false)? {
            RenameAttempt::Renamed => Ok(()),
            RenameAttempt::SourceRefused(reply) | RenameAttempt::TargetRefused(reply) => {
                Err(FtpClientError::UnexpectedReply(reply))
            }
        }
    }

    fn try_rename(&mut self, from: &str, to: &str, fast: bool) -> FtpResult<RenameAttempt> {
        let rnto = if fast {
            self.ensure_usable()?;
            let mut wire = Command::Rnfr(from).to_wire();
            wire.extend_from_slice(&Command::Rnto(to).to_wire());
            self.send_raw(&wire, &format!("RNFR {from} / RNTO {to}"))?;

            let rnfr = self.read_reply()?;
            if classify::classify_rnfr(&rnfr) != RenameStep::Accepted {
                // The pipelined RNTO is answered too; report the RNFR reply.
                self.read_reply()?;
                self.last_reply = Some(rnfr.clone());
                return Ok(RenameAttempt::SourceRefused(rnfr));
            }
            self.read_reply()?
        } else {
            let rnfr = self.command(&Command::Rnfr(from))?;
            if classify::classify_rnfr(&rnfr) != RenameStep::Accepted {
                return Ok(RenameAttempt::SourceRefused(rnfr));
            }
            self.command(&Command::Rnto(to))?
        };

        if classify::classify_rnto(&rnto) == RenameStep::Accepted {
            Ok(RenameAttempt::Renamed)
        } else {
            Ok(RenameAttempt::TargetRefused(rnto))
        }
    }
}

/// Splits `dir` for component-wise creation. The first component of an
/// absolute path keeps its leading slash.
pub fn path_components(dir: &str) -> Vec<String> {
    let mut components: Vec<String> = dir
        .split('/')
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    if dir.starts_with('/') {
        match components.first_mut() {
            Some(first) => first.insert(0, '/'),
            None => components.push("/".to_string()),
        }
    }
    components
}

/// Directory part of `path`, or `None` when it has no parent below the root.
pub fn parent_directory(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}
