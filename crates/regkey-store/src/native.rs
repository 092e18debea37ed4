//! The system registry, reached through the Win32 `Reg*` API.

use std::ptr;

use windows_sys::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_INVALID_HANDLE, ERROR_MORE_DATA,
    ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, WIN32_ERROR,
};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyW, RegDeleteValueW, RegEnumKeyExW, RegEnumValueW,
    RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY, HKEY_CLASSES_ROOT,
    HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_ALL_ACCESS,
    KEY_READ, KEY_WRITE, REG_EXPAND_SZ, REG_OPTION_NON_VOLATILE, REG_SAM_FLAGS, REG_SZ,
};

use crate::error::{StoreError, StoreResult};
use crate::hive::Hive;
use crate::traits::{Access, KeyStore};

/// Raw registry key handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeHandle(HKEY);

// SAFETY: an HKEY is an opaque kernel handle value, usable from any thread.
unsafe impl Send for NativeHandle {}

/// [`KeyStore`] backed by the machine's registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeKeyStore;

impl NativeKeyStore {
    pub fn new() -> Self {
        Self
    }
}

fn status(code: WIN32_ERROR) -> StoreResult<()> {
    match code {
        ERROR_SUCCESS => Ok(()),
        ERROR_FILE_NOT_FOUND => Err(StoreError::NotFound),
        ERROR_NO_MORE_ITEMS => Err(StoreError::NoMoreItems),
        ERROR_ACCESS_DENIED => Err(StoreError::AccessDenied),
        ERROR_INVALID_HANDLE => Err(StoreError::InvalidHandle),
        code => Err(StoreError::Os { code }),
    }
}

fn sam(access: Access) -> REG_SAM_FLAGS {
    match access {
        Access::Read => KEY_READ,
        Access::Write => KEY_WRITE,
        Access::All => KEY_ALL_ACCESS,
    }
}

/// Null-terminated UTF-16 copy of `s`.
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

impl KeyStore for NativeKeyStore {
    type Handle = NativeHandle;

    fn root(&self, hive: Hive) -> NativeHandle {
        NativeHandle(match hive {
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        })
    }

    fn open_key(&self, parent: NativeHandle, path: &str, access: Access) -> StoreResult<NativeHandle> {
        let path = wide(path);
        let mut out: HKEY = ptr::null_mut();
        // SAFETY: `path` is null-terminated and outlives the call; `out` is a
        // valid write target.
        let code = unsafe { RegOpenKeyExW(parent.0, path.as_ptr(), 0, sam(access), &mut out) };
        status(code)?;
        Ok(NativeHandle(out))
    }

    fn create_key(&self, parent: NativeHandle, path: &str, access: Access) -> StoreResult<NativeHandle> {
        let path = wide(path);
        let mut out: HKEY = ptr::null_mut();
        // SAFETY: as for `open_key`; class, security attributes and
        // disposition are optional and passed as null.
        let code = unsafe {
            RegCreateKeyExW(
                parent.0,
                path.as_ptr(),
                0,
                ptr::null(),
                REG_OPTION_NON_VOLATILE,
                sam(access),
                ptr::null(),
                &mut out,
                ptr::null_mut(),
            )
        };
        status(code)?;
        Ok(NativeHandle(out))
    }

    fn close_key(&self, handle: NativeHandle) -> StoreResult<()> {
        // SAFETY: the handle was issued by open_key/create_key and is closed once.
        status(unsafe { RegCloseKey(handle.0) })
    }

    fn enum_key(&self, handle: NativeHandle, index: u32, buf: &mut [u16]) -> StoreResult<usize> {
        let mut len = buf.len() as u32;
        // SAFETY: `len` holds the capacity of `buf` in code units.
        let code = unsafe {
            RegEnumKeyExW(
                handle.0,
                index,
                buf.as_mut_ptr(),
                &mut len,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if code == ERROR_MORE_DATA {
            // Key names are capped at 255 characters.
            return Err(StoreError::MoreData { required: 256 });
        }
        status(code)?;
        Ok(len as usize)
    }

    fn enum_value(&self, handle: NativeHandle, index: u32, buf: &mut [u16]) -> StoreResult<usize> {
        let mut len = buf.len() as u32;
        // SAFETY: `len` holds the capacity of `buf` in code units; type and
        // data outputs are not requested.
        let code = unsafe {
            RegEnumValueW(
                handle.0,
                index,
                buf.as_mut_ptr(),
                &mut len,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if code == ERROR_MORE_DATA {
            // Value names are capped at 16383 characters.
            return Err(StoreError::MoreData { required: 16384 });
        }
        status(code)?;
        Ok(len as usize)
    }

    fn query_string(&self, handle: NativeHandle, name: &str, buf: &mut [u8]) -> StoreResult<usize> {
        let name = wide(name);
        let mut kind = 0u32;
        let mut len = buf.len() as u32;
        // SAFETY: `name` is null-terminated; `len` holds the capacity of `buf`
        // in bytes and is updated to the stored size.
        let code = unsafe {
            RegQueryValueExW(
                handle.0,
                name.as_ptr(),
                ptr::null(),
                &mut kind,
                buf.as_mut_ptr(),
                &mut len,
            )
        };
        if code == ERROR_MORE_DATA {
            return Err(StoreError::MoreData {
                required: len as usize,
            });
        }
        status(code)?;
        if kind != REG_SZ && kind != REG_EXPAND_SZ {
            return Err(StoreError::TypeMismatch);
        }
        Ok(len as usize)
    }

    fn set_string(&self, handle: NativeHandle, name: &str, value: &str) -> StoreResult<()> {
        let name = wide(name);
        let data: Vec<u8> = wide(value).into_iter().flat_map(u16::to_le_bytes).collect();
        // SAFETY: both buffers outlive the call; the size includes the terminator.
        let code = unsafe {
            RegSetValueExW(
                handle.0,
                name.as_ptr(),
                0,
                REG_SZ,
                data.as_ptr(),
                data.len() as u32,
            )
        };
        status(code)
    }

    fn delete_key(&self, handle: NativeHandle, name: &str) -> StoreResult<()> {
        let name = wide(name);
        // SAFETY: `name` is null-terminated and outlives the call.
        // A key that still has subkeys is refused with ERROR_ACCESS_DENIED.
        status(unsafe { RegDeleteKeyW(handle.0, name.as_ptr()) })
    }

    fn delete_value(&self, handle: NativeHandle, name: &str) -> StoreResult<()> {
        let name = wide(name);
        // SAFETY: `name` is null-terminated and outlives the call.
        status(unsafe { RegDeleteValueW(handle.0, name.as_ptr()) })
    }
}
