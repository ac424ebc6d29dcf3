//! Windows Event Log backend built on `EvtSubscribe`

use chrono::{DateTime, Utc};
use std::ffi::c_void;
use std::ptr;
use tokio::sync::mpsc::{self, UnboundedSender};
use windows_sys::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, GetLastError};
use windows_sys::Win32::System::EventLog::{
    EVT_HANDLE, EVT_SUBSCRIBE_NOTIFY_ACTION, EVT_VARIANT, EvtClose, EvtCreateRenderContext, EvtFormatMessage,
    EvtFormatMessageEvent, EvtOpenChannelConfig, EvtOpenPublisherMetadata, EvtRender, EvtRenderContextSystem,
    EvtRenderEventValues, EvtSubscribe, EvtSubscribeActionDeliver, EvtSubscribeActionError,
    EvtSubscribeToFutureEvents, EvtSystemComputer, EvtSystemEventID, EvtSystemLevel, EvtSystemProcessID,
    EvtSystemProviderName, EvtSystemTimeCreated, EvtVarTypeNull,
};

use super::{EventStreams, WatchError, Watcher};
use crate::event::Event;

/// 100ns intervals between 1601-01-01 and the Unix epoch
const FILETIME_UNIX_OFFSET: u64 = 116_444_736_000_000_000;

pub fn create(log_name: &str) -> Result<Box<dyn Watcher>, WatchError> {
    // Opening the channel configuration checks the log exists and is readable
    let channel = to_wide(log_name);
    let config = unsafe { EvtOpenChannelConfig(0, channel.as_ptr(), 0) };
    if config == 0 {
        return Err(WatchError::Create(format!("'{}': {}", log_name, last_error())));
    }
    unsafe { EvtClose(config) };

    log::debug!("Opened event log channel '{}'", log_name);
    Ok(Box::new(EventLogWatcher {
        subscription: 0,
        context: ptr::null_mut(),
    }))
}

/// State shared with the subscription callback
struct CallbackContext {
    render_context: EVT_HANDLE,
    events: UnboundedSender<Event>,
    errors: UnboundedSender<WatchError>,
}

struct EventLogWatcher {
    subscription: EVT_HANDLE,
    context: *mut CallbackContext,
}

// The context pointer is only dereferenced by the subscription callback and freed in `shutdown`.
unsafe impl Send for EventLogWatcher {}

impl Watcher for EventLogWatcher {
    fn subscribe_from_now(&mut self, log_name: &str, query: &str) -> Result<EventStreams, WatchError> {
        let subscribe_error = |reason: String| WatchError::Subscribe {
            log_name: log_name.to_string(),
            reason,
        };

        let render_context = unsafe { EvtCreateRenderContext(0, ptr::null(), EvtRenderContextSystem as u32) };
        if render_context == 0 {
            return Err(subscribe_error(last_error()));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let context = Box::into_raw(Box::new(CallbackContext {
            render_context,
            events: event_tx,
            errors: error_tx,
        }));

        let channel = to_wide(log_name);
        let query = to_wide(query);
        let subscription = unsafe {
            EvtSubscribe(
                0,
                ptr::null_mut(),
                channel.as_ptr(),
                query.as_ptr(),
                0,
                context as *const c_void,
                Some(on_notify),
                EvtSubscribeToFutureEvents as u32,
            )
        };

        if subscription == 0 {
            let reason = last_error();
            unsafe {
                drop(Box::from_raw(context));
                EvtClose(render_context);
            }
            return Err(subscribe_error(reason));
        }

        self.subscription = subscription;
        self.context = context;
        log::info!("Subscribed to '{}' with query '{}'", log_name, query_display(&query));

        Ok(EventStreams {
            events: event_rx,
            errors: error_rx,
        })
    }

    fn shutdown(&mut self) -> Result<(), WatchError> {
        if self.subscription == 0 {
            return Ok(());
        }

        // EvtClose waits for in-flight callbacks before returning
        let closed = unsafe { EvtClose(self.subscription) } != 0;
        self.subscription = 0;
        if !closed {
            // Callbacks may still reference the context, so it is leaked
            self.context = ptr::null_mut();
            return Err(WatchError::Release(last_error()));
        }

        if !self.context.is_null() {
            let context = unsafe { Box::from_raw(self.context) };
            self.context = ptr::null_mut();
            unsafe { EvtClose(context.render_context) };
        }

        Ok(())
    }
}

impl Drop for EventLogWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("{}", e);
        }
    }
}

unsafe extern "system" fn on_notify(action: EVT_SUBSCRIBE_NOTIFY_ACTION, context: *const c_void, event: EVT_HANDLE) -> u32 {
    let context = unsafe { &*(context as *const CallbackContext) };

    if action == EvtSubscribeActionDeliver {
        match unsafe { render_event(context.render_context, event) } {
            Ok(evt) => {
                let _ = context.events.send(evt);
            }
            Err(e) => {
                let _ = context.errors.send(e);
            }
        }
    } else if action == EvtSubscribeActionError {
        // For error notifications the handle carries a Win32 error code
        let err = std::io::Error::from_raw_os_error(event as i32);
        let _ = context.errors.send(WatchError::Delivery(err.to_string()));
    }

    0
}

unsafe fn render_event(render_context: EVT_HANDLE, event: EVT_HANDLE) -> Result<Event, WatchError> {
    let mut used = 0u32;
    let mut count = 0u32;

    let ok = unsafe {
        EvtRender(
            render_context,
            event,
            EvtRenderEventValues as u32,
            0,
            ptr::null_mut(),
            &mut used,
            &mut count,
        )
    };
    if ok == 0 && unsafe { GetLastError() } != ERROR_INSUFFICIENT_BUFFER {
        return Err(WatchError::Delivery(format!("Failed to render event: {}", last_error())));
    }

    // u64 backing keeps the variants aligned
    let mut buffer = vec![0u64; (used as usize).div_ceil(8)];
    let ok = unsafe {
        EvtRender(
            render_context,
            event,
            EvtRenderEventValues as u32,
            (buffer.len() * 8) as u32,
            buffer.as_mut_ptr() as *mut c_void,
            &mut used,
            &mut count,
        )
    };
    if ok == 0 {
        return Err(WatchError::Delivery(format!("Failed to render event: {}", last_error())));
    }

    let values = unsafe { std::slice::from_raw_parts(buffer.as_ptr() as *const EVT_VARIANT, count as usize) };
    let value = |id: i32| values.get(id as usize).filter(|v| v.Type != EvtVarTypeNull as u32);

    let provider_name = value(EvtSystemProviderName)
        .map(|v| unsafe { from_wide_ptr(v.Anonymous.StringVal) })
        .unwrap_or_default();
    let computer_name = value(EvtSystemComputer)
        .map(|v| unsafe { from_wide_ptr(v.Anonymous.StringVal) })
        .unwrap_or_default();
    let level = value(EvtSystemLevel).map(|v| unsafe { v.Anonymous.ByteVal } as i32).unwrap_or(0);
    let event_id = value(EvtSystemEventID).map(|v| unsafe { v.Anonymous.UInt16Val } as u32).unwrap_or(0);
    let process_id = value(EvtSystemProcessID).map(|v| unsafe { v.Anonymous.UInt32Val }).unwrap_or(0);
    let created = value(EvtSystemTimeCreated)
        .and_then(|v| filetime_to_utc(unsafe { v.Anonymous.FileTimeVal }))
        .unwrap_or_else(Utc::now);

    let message = unsafe { format_message(&provider_name, event) };

    Ok(Event {
        created,
        level,
        provider_name,
        computer_name,
        process_id,
        event_id,
        message,
    })
}

/// Render the event's message from its publisher metadata. Empty when unavailable.
unsafe fn format_message(provider_name: &str, event: EVT_HANDLE) -> String {
    let provider = to_wide(provider_name);
    let metadata = unsafe { EvtOpenPublisherMetadata(0, provider.as_ptr(), ptr::null(), 0, 0) };
    if metadata == 0 {
        log::debug!("No publisher metadata for '{}': {}", provider_name, last_error());
        return String::new();
    }

    let mut used = 0u32;
    let flags = EvtFormatMessageEvent as u32;
    let ok = unsafe { EvtFormatMessage(metadata, event, 0, 0, ptr::null(), flags, 0, ptr::null_mut(), &mut used) };

    let message = if ok == 0 && unsafe { GetLastError() } == ERROR_INSUFFICIENT_BUFFER {
        let mut buffer = vec![0u16; used as usize];
        let ok = unsafe {
            EvtFormatMessage(
                metadata,
                event,
                0,
                0,
                ptr::null(),
                flags,
                buffer.len() as u32,
                buffer.as_mut_ptr(),
                &mut used,
            )
        };
        if ok != 0 {
            let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
            String::from_utf16_lossy(&buffer[..end])
        } else {
            log::debug!("Failed to format message for '{}': {}", provider_name, last_error());
            String::new()
        }
    } else {
        String::new()
    };

    unsafe { EvtClose(metadata) };
    message
}

fn filetime_to_utc(ticks: u64) -> Option<DateTime<Utc>> {
    let since_epoch = ticks.checked_sub(FILETIME_UNIX_OFFSET)?;
    let secs = (since_epoch / 10_000_000) as i64;
    let nanos = ((since_epoch % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

unsafe fn from_wide_ptr(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    String::from_utf16_lossy(unsafe { std::slice::from_raw_parts(ptr, len) })
}

fn query_display(wide: &[u16]) -> String {
    let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

fn last_error() -> String {
    std::io::Error::last_os_error().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filetime_to_utc() {
        // 2023-01-01T00:00:00Z
        let ticks = FILETIME_UNIX_OFFSET + 1_672_531_200 * 10_000_000;
        assert_eq!(filetime_to_utc(ticks), Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_filetime_before_epoch() {
        assert_eq!(filetime_to_utc(0), None);
    }

    #[test]
    fn test_wide_roundtrip() {
        let wide = to_wide("Application");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(unsafe { from_wide_ptr(wide.as_ptr()) }, "Application");
    }
}
