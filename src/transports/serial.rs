//! Serial device nodes driven by the tokio reactor
//!
//! The node is opened non-blocking and registered with [`AsyncFd`], so a
//! pending read is just a parked task: dropping it leaves nothing running
//! and closing the port never waits for the device to speak. Terminals get
//! the configured line settings and raw mode; other nodes (FIFOs, sockets)
//! are used as they are.

use std::io;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use rustix::fs::{Mode, OFlags};
use rustix::termios::{self, ControlModes, InputModes, OptionalActions, QueueSelector, Termios};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::config::{FlowControl, Parity, SerialConfig};

/// A non-blocking serial port.
#[derive(Debug)]
pub struct SerialPort {
    fd: AsyncFd<OwnedFd>,
}

impl SerialPort {
    /// Open `path` and, if it is a terminal, apply `serial` to it.
    ///
    /// Must be called from within a tokio runtime with IO enabled.
    pub fn open(path: &Path, serial: &SerialConfig) -> io::Result<Self> {
        let fd = rustix::fs::open(
            path,
            OFlags::RDWR | OFlags::NOCTTY | OFlags::NONBLOCK | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        if termios::isatty(&fd) {
            let mut settings = termios::tcgetattr(&fd)?;
            apply_line_settings(&mut settings, serial)?;
            termios::tcsetattr(&fd, OptionalActions::Now, &settings)?;
            // Input queued before raw mode went through the line discipline
            termios::tcflush(&fd, QueueSelector::IFlush)?;
        } else {
            debug!("{} is not a terminal, line settings not applied", path.display());
        }

        Ok(Self { fd: AsyncFd::new(fd)? })
    }
}

/// Raw mode plus speed, character size, parity, stop bits and flow control.
///
/// Raw mode turns off canonical input, echo, signal characters and every
/// byte translation, so frame bytes arrive unchanged and without waiting
/// for a line end.
pub(crate) fn apply_line_settings(settings: &mut Termios, serial: &SerialConfig) -> io::Result<()> {
    settings.make_raw();
    settings.set_speed(serial.baud_rate)?;

    let control = &mut settings.control_modes;
    control.remove(ControlModes::CSIZE);
    control.insert(match serial.data_bits {
        5 => ControlModes::CS5,
        6 => ControlModes::CS6,
        7 => ControlModes::CS7,
        _ => ControlModes::CS8,
    });
    control.set(ControlModes::CSTOPB, serial.stop_bits == 2);
    control.set(ControlModes::PARENB, serial.parity != Parity::None);
    control.set(ControlModes::PARODD, serial.parity == Parity::Odd);
    control.set(ControlModes::CRTSCTS, serial.flow_control == FlowControl::Hardware);
    control.insert(ControlModes::CREAD | ControlModes::CLOCAL);

    let input = &mut settings.input_modes;
    input.set(InputModes::INPCK, serial.parity != Parity::None);
    input.set(InputModes::IXON | InputModes::IXOFF, serial.flow_control == FlowControl::Software);
    Ok(())
}

impl AsyncRead for SerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();

            match guard.try_io(|fd| Ok(rustix::io::read(fd.get_ref(), unfilled)?)) {
                Ok(Ok(count)) => {
                    buf.advance(count);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for SerialPort {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.fd.poll_write_ready(cx))?;

            match guard.try_io(|fd| Ok(rustix::io::write(fd.get_ref(), buf)?)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    // Writes go straight to the kernel, nothing is buffered here
    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
