// SPDX-License-Identifier: MIT
//
// Windows terminal: console modes, ReadConsoleInputW, screen buffer info.
//
// Safety: the console API is only reachable through winapi FFI. Every
// handle passed in comes from a `File` we keep open for the call.
#![allow(unsafe_code)]
//
// CONIN$ and CONOUT$ are opened directly so redirected stdio doesn't matter.
// VT processing is switched on for output at open, so escape sequences work
// before raw mode too. Output is converted to UTF-16 and written with
// WriteConsoleW, independent of the console code page.
//
// Input: a reader thread waits on CONIN$ in POLL_INTERVAL slices and drains
// console input records. Key-down events carry UTF-16 units (VT input mode
// turns special keys into escape sequences); window-buffer-size events fire
// the resize callback.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::windows::io::AsRawHandle;
use std::ptr;

use n_term::input::Utf16Decoder;
use n_term::reader::{self, ReaderThread, StopFlag};
use n_term::{Error, InputQueue, ResizeCallback, ResizeSlot, Result, Size};
use winapi::shared::minwindef::DWORD;
use winapi::um::consoleapi::{GetConsoleMode, ReadConsoleInputW, SetConsoleMode, WriteConsoleW};
use winapi::um::synchapi::WaitForSingleObject;
use winapi::um::winbase::{WAIT_FAILED, WAIT_OBJECT_0};
use winapi::um::wincon::{
    CONSOLE_SCREEN_BUFFER_INFO, DISABLE_NEWLINE_AUTO_RETURN, ENABLE_ECHO_INPUT,
    ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT, ENABLE_VIRTUAL_TERMINAL_INPUT,
    ENABLE_VIRTUAL_TERMINAL_PROCESSING, ENABLE_WINDOW_INPUT, GetConsoleScreenBufferInfo,
    INPUT_RECORD, KEY_EVENT, WINDOW_BUFFER_SIZE_EVENT,
};
use winapi::um::winnt::HANDLE;

use crate::platform::PlatformTerminal;

/// Records drained per ReadConsoleInputW call.
const RECORD_BATCH: usize = 64;

fn handle_of(file: &File) -> HANDLE {
    file.as_raw_handle().cast()
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "terminal is closed")
}

fn get_mode(file: &File, call: &'static str) -> Result<DWORD> {
    let mut mode: DWORD = 0;
    if unsafe { GetConsoleMode(handle_of(file), &mut mode) } == 0 {
        return Err(Error::syscall(call));
    }
    Ok(mode)
}

fn set_mode(file: &File, mode: DWORD, call: &'static str) -> Result<()> {
    if unsafe { SetConsoleMode(handle_of(file), mode) } == 0 {
        return Err(Error::syscall(call));
    }
    Ok(())
}

/// No echo, no line editing, no Ctrl-C processing; VT sequences and
/// resize events on.
const fn raw_input_mode(mode: DWORD) -> DWORD {
    (mode & !(ENABLE_ECHO_INPUT | ENABLE_LINE_INPUT | ENABLE_PROCESSED_INPUT))
        | ENABLE_VIRTUAL_TERMINAL_INPUT
        | ENABLE_WINDOW_INPUT
}

const fn vt_output_mode(mode: DWORD) -> DWORD {
    mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING | DISABLE_NEWLINE_AUTO_RETURN
}

/// Output bytes as UTF-16 for WriteConsoleW. Everything n-term encodes is
/// UTF-8; an invalid sequence from `write_raw` becomes U+FFFD rather than
/// reaching the console as code-page bytes.
fn to_wide(bytes: &[u8]) -> Vec<u16> {
    String::from_utf8_lossy(bytes).encode_utf16().collect()
}

fn read_loop(conin: &File, queue: &InputQueue, resize: &ResizeSlot, stop: &StopFlag) {
    let _closer = queue.close_on_drop();
    let handle = handle_of(conin);
    let timeout = DWORD::try_from(reader::POLL_INTERVAL.as_millis()).unwrap_or(50);
    let mut records: [INPUT_RECORD; RECORD_BATCH] = unsafe { std::mem::zeroed() };
    let mut decoder = Utf16Decoder::new();

    while !stop.is_set() {
        match unsafe { WaitForSingleObject(handle, timeout) } {
            WAIT_OBJECT_0 => {}
            WAIT_FAILED => {
                tracing::warn!(error = %io::Error::last_os_error(), "console input wait failed");
                break;
            }
            _ => continue,
        }

        let mut count: DWORD = 0;
        let ok = unsafe {
            ReadConsoleInputW(handle, records.as_mut_ptr(), RECORD_BATCH as DWORD, &mut count)
        };
        if ok == 0 {
            tracing::warn!(error = %io::Error::last_os_error(), "ReadConsoleInputW failed");
            break;
        }

        for record in &records[..count as usize] {
            match record.EventType {
                KEY_EVENT => {
                    let key = unsafe { record.Event.KeyEvent() };
                    if key.bKeyDown == 0 {
                        continue;
                    }
                    let unit = unsafe { *key.uChar.UnicodeChar() };
                    if unit == 0 {
                        continue;
                    }
                    if let Some(ch) = decoder.push(unit) {
                        for _ in 0..key.wRepeatCount.max(1) {
                            queue.push(ch);
                        }
                    }
                }
                WINDOW_BUFFER_SIZE_EVENT => resize.notify(),
                _ => {}
            }
        }
    }
}

/// The attached console, opened via `CONIN$` / `CONOUT$`.
pub struct WindowsTerminal {
    conin: Option<File>,
    conout: Option<File>,
    /// Output mode before VT processing was switched on at open.
    initial_output_mode: DWORD,
    /// Saved input mode while raw mode is active.
    saved_input_mode: Option<DWORD>,
    input: InputQueue,
    resize: ResizeSlot,
    reader: Option<ReaderThread>,
}

impl WindowsTerminal {
    /// Open the console handles, enable VT output, start the input thread.
    ///
    /// # Errors
    ///
    /// [`Error::Init`] if there is no console attached or the input thread
    /// can't be started; [`Error::TerminalUnavailable`] if the output mode
    /// can't be set.
    pub fn open() -> Result<Self> {
        let conin = OpenOptions::new()
            .read(true)
            .write(true)
            .open("CONIN$")
            .map_err(Error::Init)?;
        let conout = OpenOptions::new()
            .read(true)
            .write(true)
            .open("CONOUT$")
            .map_err(Error::Init)?;

        let initial_output_mode = get_mode(&conout, "GetConsoleMode(CONOUT$)")?;
        set_mode(
            &conout,
            vt_output_mode(initial_output_mode),
            "SetConsoleMode(CONOUT$)",
        )?;

        let input = InputQueue::new();
        let resize = ResizeSlot::new();

        let reader_conin = conin.try_clone().map_err(Error::Init)?;
        let queue = input.clone();
        let slot = resize.clone();
        let reader = ReaderThread::spawn("n-native-input", move |stop| {
            read_loop(&reader_conin, &queue, &slot, &stop);
        })
        .map_err(Error::Init)?;

        tracing::debug!("console opened");
        Ok(Self {
            conin: Some(conin),
            conout: Some(conout),
            initial_output_mode,
            saved_input_mode: None,
            input,
            resize,
            reader: Some(reader),
        })
    }

    fn conin(&self, call: &'static str) -> Result<&File> {
        self.conin.as_ref().ok_or_else(|| Error::TerminalUnavailable {
            call,
            source: closed(),
        })
    }

    fn conout(&self, call: &'static str) -> Result<&File> {
        self.conout.as_ref().ok_or_else(|| Error::TerminalUnavailable {
            call,
            source: closed(),
        })
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.conout.is_none()
    }
}

impl PlatformTerminal for WindowsTerminal {
    fn enable_raw_mode(&mut self) -> Result<()> {
        if self.saved_input_mode.is_some() {
            return Ok(());
        }
        let conin = self.conin("GetConsoleMode(CONIN$)")?;
        let mode = get_mode(conin, "GetConsoleMode(CONIN$)")?;
        set_mode(conin, raw_input_mode(mode), "SetConsoleMode(CONIN$)")?;
        self.saved_input_mode = Some(mode);
        tracing::debug!("raw mode enabled");
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        let Some(mode) = self.saved_input_mode else {
            return Ok(());
        };
        let conin = self.conin("SetConsoleMode(CONIN$)")?;
        set_mode(conin, mode, "SetConsoleMode(CONIN$)")?;
        self.saved_input_mode = None;
        tracing::debug!("raw mode disabled");
        Ok(())
    }

    fn is_raw_mode(&self) -> bool {
        self.saved_input_mode.is_some()
    }

    fn size(&self) -> Result<Size> {
        let conout = self.conout("GetConsoleScreenBufferInfo")?;
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        if unsafe { GetConsoleScreenBufferInfo(handle_of(conout), &mut info) } == 0 {
            return Err(Error::SizeQuery(io::Error::last_os_error()));
        }
        let window = info.srWindow;
        let width = u16::try_from(i32::from(window.Right) - i32::from(window.Left) + 1).unwrap_or(0);
        let height = u16::try_from(i32::from(window.Bottom) - i32::from(window.Top) + 1).unwrap_or(0);
        Ok(Size::new(width, height))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let conout = self.conout.as_ref().ok_or_else(closed)?;
        let handle = handle_of(conout);
        let wide = to_wide(bytes);

        let mut rest = wide.as_slice();
        while !rest.is_empty() {
            let chunk = rest.len().min(DWORD::MAX as usize);
            let mut written: DWORD = 0;
            let ok = unsafe {
                WriteConsoleW(
                    handle,
                    rest.as_ptr().cast(),
                    chunk as DWORD,
                    &mut written,
                    ptr::null_mut(),
                )
            };
            if ok == 0 {
                return Err(Error::Write(io::Error::last_os_error()));
            }
            if written == 0 {
                return Err(Error::Write(io::ErrorKind::WriteZero.into()));
            }
            rest = &rest[written as usize..];
        }
        Ok(())
    }

    fn input(&self) -> &InputQueue {
        &self.input
    }

    fn on_resize(&mut self, callback: ResizeCallback) {
        self.resize.set(callback);
    }

    fn close(&mut self) -> Result<()> {
        if self.conout.is_none() {
            return Ok(());
        }
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        let restored = self.disable_raw_mode();
        self.saved_input_mode = None;
        let output = match &self.conout {
            Some(conout) => set_mode(conout, self.initial_output_mode, "SetConsoleMode(CONOUT$)"),
            None => Ok(()),
        };
        self.conin = None;
        self.conout = None;
        tracing::debug!("console closed");
        restored.and(output)
    }
}

impl Drop for WindowsTerminal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
