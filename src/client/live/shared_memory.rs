//! The sim's own shared-memory segment.

use std::ptr::NonNull;
use std::time::Duration;
use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, LPARAM, WAIT_OBJECT_0, WAIT_TIMEOUT, WPARAM};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
    OpenFileMappingW, UnmapViewOfFile, VirtualQuery,
};
use windows::Win32::System::Threading::{
    OpenEventW, SYNCHRONIZATION_ACCESS_RIGHTS, WaitForSingleObject,
};
use windows::Win32::UI::WindowsAndMessaging::{
    HWND_BROADCAST, RegisterWindowMessageW, SendNotifyMessageW,
};
use windows::core::PCWSTR;

use super::TelemetrySource;
use crate::broadcast::{BROADCAST_MESSAGE_NAME, BroadcastMessage};
use crate::schema::header::{DATA_HEADER_SIZE, DataHeader};
use crate::{Result, TelemetryError};

const MEM_MAP_FILE_NAME: &str = "Local\\IRSDKMemMapFileName";
const DATA_VALID_EVENT_NAME: &str = "Local\\IRSDKDataValidEvent";

/// `SYNCHRONIZE` access right
const SYNCHRONIZE: u32 = 0x0010_0000;

/// Read-only view of the sim's segment plus its data-valid event.
pub struct SharedMemorySource {
    mapping: HANDLE,
    base: NonNull<u8>,
    len: usize,
    event: HANDLE,
    broadcast_msg: u32,
}

impl SharedMemorySource {
    /// Open the mapping and event. Fails while the sim is not running.
    pub fn open() -> Result<Self> {
        trace!("Opening sim shared memory");

        let mapping = unsafe {
            let name = wide_string(MEM_MAP_FILE_NAME);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(name.as_ptr()))
                .map_err(|e| TelemetryError::windows_api_error("OpenFileMappingW", e))?
        };

        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, 0) };
        let Some(base) = NonNull::new(view.Value as *mut u8) else {
            let err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(mapping);
            }
            return Err(TelemetryError::windows_api_error("MapViewOfFile", err));
        };

        let len = unsafe {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            let written = VirtualQuery(
                Some(base.as_ptr() as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            );
            if written == 0 { DATA_HEADER_SIZE } else { info.RegionSize }
        };

        let event = unsafe {
            let name = wide_string(DATA_VALID_EVENT_NAME);
            OpenEventW(SYNCHRONIZATION_ACCESS_RIGHTS(SYNCHRONIZE), false, PCWSTR::from_raw(name.as_ptr()))
        };
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                unsafe {
                    let _ = UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: base.as_ptr() as *mut _ });
                    let _ = CloseHandle(mapping);
                }
                return Err(TelemetryError::windows_api_error("OpenEventW", e));
            }
        };

        let broadcast_msg = unsafe {
            let name = wide_string(BROADCAST_MESSAGE_NAME);
            RegisterWindowMessageW(PCWSTR::from_raw(name.as_ptr()))
        };

        let source = Self { mapping, base, len, event, broadcast_msg };
        let header = source.header()?;
        debug!(
            len,
            version = header.version,
            num_vars = header.num_vars,
            num_buf = header.num_buf,
            "Mapped sim shared memory"
        );
        Ok(source)
    }

    fn header(&self) -> Result<DataHeader> {
        let mut raw = [0u8; DATA_HEADER_SIZE];
        if !self.read_at(0, &mut raw) {
            return Err(TelemetryError::memory_access_error(0));
        }
        DataHeader::parse(&raw)
    }
}

impl TelemetrySource for SharedMemorySource {
    fn wait_for_data(&self, timeout: Duration) -> bool {
        let ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        match unsafe { WaitForSingleObject(self.event, ms) } {
            WAIT_OBJECT_0 => true,
            WAIT_TIMEOUT => false,
            other => {
                warn!(code = other.0, "WaitForSingleObject failed");
                false
            }
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn read_at(&self, offset: usize, out: &mut [u8]) -> bool {
        let Some(end) = offset.checked_add(out.len()) else {
            return false;
        };
        if end > self.len {
            return false;
        }
        // SAFETY: the range lies inside the mapped view, which lives as long as self
        unsafe {
            std::ptr::copy_nonoverlapping(self.base.as_ptr().add(offset), out.as_mut_ptr(), out.len());
        }
        true
    }

    fn broadcast(&self, message: BroadcastMessage) -> Result<()> {
        if self.broadcast_msg == 0 {
            return Err(TelemetryError::connection_failed("broadcast message is not registered"));
        }
        trace!(msg = message.msg, var1 = message.var1, var2 = message.var2, "Posting broadcast");
        unsafe {
            SendNotifyMessageW(
                HWND_BROADCAST,
                self.broadcast_msg,
                WPARAM(message.wparam() as usize),
                LPARAM(message.lparam() as isize),
            )
        }
        .map_err(|e| TelemetryError::windows_api_error("SendNotifyMessageW", e))
    }
}

impl Drop for SharedMemorySource {
    fn drop(&mut self) {
        unsafe {
            let _ = UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ });
            let _ = CloseHandle(self.mapping);
            let _ = CloseHandle(self.event);
        }
    }
}

// SAFETY: the view is mapped read-only and only ever copied out of; the
// handles are kernel objects usable from any thread
unsafe impl Send for SharedMemorySource {}
unsafe impl Sync for SharedMemorySource {}

fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
