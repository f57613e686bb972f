//! Privilege drop.
//!
//! Runs after the capture source (and, when writing, the first output
//! file) are open: optional chroot, then the target user's groups, then
//! the target UID.  Order matters; once the UID changes none of the
//! earlier steps are possible.

#[cfg(unix)]
use std::ffi::CString;

#[cfg(unix)]
use anyhow::{anyhow, bail, Context as _};

/// Switches to `username`, optionally inside `chroot_dir`.
#[cfg(unix)]
pub fn droproot(username: &str, chroot_dir: Option<&str>) -> anyhow::Result<()> {
    use nix::unistd::{chdir, chroot, initgroups, setgid, setuid, User};

    let user = User::from_name(username)
        .with_context(|| format!("looking up user '{}'", username))?
        .ok_or_else(|| anyhow!("couldn't find user '{}'", username))?;

    if let Some(dir) = chroot_dir {
        chroot(dir)
            .and_then(|_| chdir("/"))
            .with_context(|| format!("couldn't chroot/chdir to '{}'", dir))?;
    }

    let cname = CString::new(username).context("user name contains NUL")?;
    initgroups(&cname, user.gid)
        .and_then(|_| setgid(user.gid))
        .and_then(|_| setuid(user.uid))
        .with_context(|| {
            format!(
                "couldn't change to '{}' uid={} gid={}",
                username, user.uid, user.gid
            )
        })?;
    Ok(())
}

/// Startup validation shared by the CLI: chroot without a user to drop
/// to would leave the process root inside the jail.
#[cfg(unix)]
pub fn validate(username: Option<&str>, chroot_dir: Option<&str>) -> anyhow::Result<()> {
    if chroot_dir.is_some() && username.is_none() {
        bail!("chroot without dropping root is insecure");
    }
    Ok(())
}

/// True when the process can expect privilege operations to succeed.
#[cfg(unix)]
pub fn running_as_root() -> bool {
    nix::unistd::Uid::effective().is_root() || nix::unistd::Uid::current().is_root()
}
