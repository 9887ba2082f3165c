//! Waits for a mouse click anywhere on screen by grabbing the X11 pointer.

use grab_pixel::Point;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrabError {
    #[cfg(target_os = "linux")]
    #[error("failed to open the display")]
    NoDisplay,

    #[cfg(target_os = "linux")]
    #[error("failed to create the crosshair cursor")]
    NoCursor,

    #[cfg(target_os = "linux")]
    #[error("failed to grab the pointer (status {0})")]
    GrabFailed(i32),

    #[cfg(target_os = "linux")]
    #[error("failed to get the click point location")]
    NoClick,

    #[cfg(not(target_os = "linux"))]
    #[error("pointer grab needs an X11 display, which this platform does not provide")]
    Unsupported,
}

/// Shows a crosshair, blocks until a mouse button is pressed and returns the
/// click position in root window (screen) coordinates.
#[cfg(target_os = "linux")]
pub fn wait_for_click() -> Result<Point, GrabError> {
    xlib_grab::wait_for_click()
}

#[cfg(not(target_os = "linux"))]
pub fn wait_for_click() -> Result<Point, GrabError> {
    Err(GrabError::Unsupported)
}

#[cfg(target_os = "linux")]
mod xlib_grab {
    use std::os::raw::c_uint;
    use std::ptr;

    use grab_pixel::Point;
    use x11::xlib;

    use super::GrabError;

    // X11/cursorfont.h
    const XC_TCROSS: c_uint = 130;

    struct Display(*mut xlib::Display);

    impl Display {
        fn open() -> Result<Self, GrabError> {
            let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
            if display.is_null() {
                return Err(GrabError::NoDisplay);
            }
            Ok(Self(display))
        }
    }

    impl Drop for Display {
        fn drop(&mut self) {
            unsafe {
                xlib::XCloseDisplay(self.0);
            }
        }
    }

    struct Cursor<'a> {
        display: &'a Display,
        id: xlib::Cursor,
    }

    impl<'a> Cursor<'a> {
        fn crosshair(display: &'a Display) -> Result<Self, GrabError> {
            let id = unsafe { xlib::XCreateFontCursor(display.0, XC_TCROSS) };
            if id == 0 {
                return Err(GrabError::NoCursor);
            }
            Ok(Self { display, id })
        }
    }

    impl Drop for Cursor<'_> {
        fn drop(&mut self) {
            unsafe {
                xlib::XFreeCursor(self.display.0, self.id);
            }
        }
    }

    /// Active pointer grab, released on drop.
    struct PointerGrab<'a> {
        display: &'a Display,
    }

    impl<'a> PointerGrab<'a> {
        fn acquire(display: &'a Display, root: xlib::Window, cursor: &Cursor<'_>) -> Result<Self, GrabError> {
            let status = unsafe {
                xlib::XGrabPointer(
                    display.0,
                    root,
                    xlib::False,
                    xlib::ButtonPressMask as c_uint,
                    xlib::GrabModeSync,
                    xlib::GrabModeAsync,
                    root,
                    cursor.id,
                    xlib::CurrentTime,
                )
            };
            if status != xlib::GrabSuccess {
                return Err(GrabError::GrabFailed(status));
            }
            Ok(Self { display })
        }
    }

    impl Drop for PointerGrab<'_> {
        fn drop(&mut self) {
            unsafe {
                xlib::XUngrabPointer(self.display.0, xlib::CurrentTime);
                xlib::XFlush(self.display.0);
            }
        }
    }

    pub(super) fn wait_for_click() -> Result<Point, GrabError> {
        let display = Display::open()?;
        let root = unsafe { xlib::XDefaultRootWindow(display.0) };
        let cursor = Cursor::crosshair(&display)?;
        let _grab = PointerGrab::acquire(&display, root, &cursor)?;
        tracing::debug!(root, "pointer grabbed");

        println!("Click on any pixel on your screen to display its color");

        let mut event: xlib::XEvent = unsafe { std::mem::zeroed() };
        unsafe {
            xlib::XAllowEvents(display.0, xlib::SyncPointer, xlib::CurrentTime);
            xlib::XWindowEvent(display.0, root, xlib::ButtonPressMask, &mut event);
        }

        if event.get_type() != xlib::ButtonPress {
            return Err(GrabError::NoClick);
        }
        let button: xlib::XButtonEvent = event.into();
        tracing::debug!(button = button.button, x = button.x_root, y = button.y_root, "button press");

        let x = u32::try_from(button.x_root).map_err(|_| GrabError::NoClick)?;
        let y = u32::try_from(button.y_root).map_err(|_| GrabError::NoClick)?;
        Ok(Point::new(x, y))
    }
}
