use std::io;

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::reader::Transport;
use super::{MemoryReader, RemoteAddress};

/// An attachment to a running target process.
///
/// Holds no OS resources: every copy is a fresh `process_vm_readv` /
/// `process_vm_writev` call addressed by pid.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pub pid: i32,
    pub base_address: u64,
}

impl ProcessHandle {
    /// Attach to `pid` whose module of interest is loaded at `base_address`.
    ///
    /// Fails if the process does not exist or the base cannot be read;
    /// both are fatal startup conditions.
    pub fn attach(pid: i32, base_address: u64) -> Result<Self> {
        if pid <= 0 {
            return Err(Error::ProcessNotFound(format!("invalid pid {}", pid)));
        }
        if base_address == 0 {
            return Err(Error::ModuleBaseUnreadable(0));
        }

        let handle = Self { pid, base_address };
        if !handle.is_alive() {
            return Err(Error::ProcessNotFound(format!("pid {}", pid)));
        }

        MemoryReader::new(&handle).probe(RemoteAddress::new(base_address))?;

        info!("Attached to pid {} (base: {:#x})", pid, base_address);
        Ok(handle)
    }

    pub fn base(&self) -> RemoteAddress {
        RemoteAddress::new(self.base_address)
    }

    /// Whether the pid still names a live process.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn is_alive(&self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // Signal 0 only probes. EPERM still means the process exists.
        match kill(Pid::from_raw(self.pid), None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(e) => {
                debug!("pid {} probe failed: {}", self.pid, e);
                false
            }
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub fn is_alive(&self) -> bool {
        debug!("liveness probe unsupported for pid {}", self.pid);
        false
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl Transport for ProcessHandle {
    fn copy_from(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        use nix::sys::uio::{RemoteIoVec, process_vm_readv};
        use nix::unistd::Pid;
        use std::io::IoSliceMut;

        let remote = [RemoteIoVec {
            base: address as usize,
            len: buf.len(),
        }];
        let mut local = [IoSliceMut::new(buf)];
        process_vm_readv(Pid::from_raw(self.pid), &mut local, &remote).map_err(io::Error::from)
    }

    fn copy_to(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        use nix::sys::uio::{RemoteIoVec, process_vm_writev};
        use nix::unistd::Pid;
        use std::io::IoSlice;

        let remote = [RemoteIoVec {
            base: address as usize,
            len: data.len(),
        }];
        let local = [IoSlice::new(data)];
        process_vm_writev(Pid::from_raw(self.pid), &local, &remote).map_err(io::Error::from)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl Transport for ProcessHandle {
    fn copy_from(&self, _address: u64, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, Error::Unsupported))
    }

    fn copy_to(&self, _address: u64, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, Error::Unsupported))
    }
}
