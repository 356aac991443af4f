/// What the host can offer fio, resolved once at startup.
///
/// macOS has neither libaio/io_uring style asynchronous engines nor reliable `O_DIRECT`, so fio is
/// restricted to synchronous single threaded I/O there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub supports_async_io_engine: bool,
    pub supports_direct_io: bool,
}

impl Platform {
    pub const POSIX: Platform = Platform {
        supports_async_io_engine: true,
        supports_direct_io: true,
    };

    pub const APPLE: Platform = Platform {
        supports_async_io_engine: false,
        supports_direct_io: false,
    };

    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::APPLE
        } else {
            Self::POSIX
        }
    }
}
