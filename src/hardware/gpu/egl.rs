//! EGL display and GL string queries
//!
//! `libEGL` is loaded at runtime. The display session and the rendering
//! context are scoped guards; the context borrows the session so it is always
//! destroyed before the display is terminated.

use khronos_egl as egl;
use std::ffi::{c_char, CStr};
use tracing::{debug, error, info, warn};

use super::models::{split_list, EglInformation, GlInformation};
use crate::config::EglConfig;
use crate::error::ProbeError;

/// EGL display strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EglString {
    Vendor,
    Version,
    Extensions,
    ClientApis,
}

/// `glGetString` names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlString {
    Vendor,
    Renderer,
    Version,
    Extensions,
}

impl GlString {
    fn raw(self) -> u32 {
        match self {
            GlString::Vendor => 0x1F00,
            GlString::Renderer => 0x1F01,
            GlString::Version => 0x1F02,
            GlString::Extensions => 0x1F03,
        }
    }
}

/// The EGL calls the probe needs
pub trait EglApi {
    type Display: Copy;
    type Context: Copy;

    /// `eglGetDisplay(EGL_DEFAULT_DISPLAY)`
    fn default_display(&self) -> Option<Self::Display>;
    fn initialize(&self, display: Self::Display) -> Result<(i32, i32), ProbeError>;
    fn terminate(&self, display: Self::Display) -> Result<(), ProbeError>;
    fn query_string(&self, display: Self::Display, name: EglString) -> Option<String>;
    /// Choose a config renderable with the given GLES version and create a context on it
    fn create_context(
        &self,
        display: Self::Display,
        client_version: i32,
    ) -> Result<Self::Context, ProbeError>;
    fn destroy_context(&self, display: Self::Display, context: Self::Context)
        -> Result<(), ProbeError>;
    /// Bind `context` without surfaces, or unbind with `None`
    fn make_current(
        &self,
        display: Self::Display,
        context: Option<Self::Context>,
    ) -> Result<(), ProbeError>;
    /// `glGetString` on the current context
    fn gl_string(&self, name: GlString) -> Option<String>;
}

type GlGetString = unsafe extern "system" fn(u32) -> *const u8;

/// EGL 1.4 loaded from the system's `libEGL`
pub struct LoadedEgl {
    instance: egl::DynamicInstance<egl::EGL1_4>,
}

impl LoadedEgl {
    pub fn load() -> Result<Self, ProbeError> {
        // SAFETY: loading libEGL runs its initializers; it is a system library
        let instance = unsafe { egl::DynamicInstance::<egl::EGL1_4>::load_required() }
            .map_err(|err| ProbeError::Unsupported(format!("EGL ({})", err)))?;
        Ok(Self { instance })
    }
}

fn egl_failure(what: &'static str, err: egl::Error) -> ProbeError {
    ProbeError::acquisition(what, err)
}

impl EglApi for LoadedEgl {
    type Display = egl::Display;
    type Context = egl::Context;

    fn default_display(&self) -> Option<egl::Display> {
        // SAFETY: EGL_DEFAULT_DISPLAY is always a valid native display id
        unsafe { self.instance.get_display(egl::DEFAULT_DISPLAY) }
    }

    fn initialize(&self, display: egl::Display) -> Result<(i32, i32), ProbeError> {
        self.instance
            .initialize(display)
            .map_err(|err| egl_failure("EGL display", err))
    }

    fn terminate(&self, display: egl::Display) -> Result<(), ProbeError> {
        self.instance
            .terminate(display)
            .map_err(|err| egl_failure("EGL display", err))
    }

    fn query_string(&self, display: egl::Display, name: EglString) -> Option<String> {
        let name = match name {
            EglString::Vendor => egl::VENDOR,
            EglString::Version => egl::VERSION,
            EglString::Extensions => egl::EXTENSIONS,
            EglString::ClientApis => egl::CLIENT_APIS,
        };
        self.instance
            .query_string(Some(display), name)
            .ok()
            .map(|value| value.to_string_lossy().into_owned())
    }

    fn create_context(
        &self,
        display: egl::Display,
        client_version: i32,
    ) -> Result<egl::Context, ProbeError> {
        let renderable = match client_version {
            1 => egl::OPENGL_ES_BIT,
            2 => egl::OPENGL_ES2_BIT,
            // EGL_OPENGL_ES3_BIT_KHR
            _ => 0x0040,
        };
        let config_attribs = [egl::RENDERABLE_TYPE, renderable, egl::NONE];
        let config = self
            .instance
            .choose_first_config(display, &config_attribs)
            .map_err(|err| egl_failure("EGL config", err))?
            .ok_or_else(|| ProbeError::acquisition("EGL config", "no matching config"))?;

        let context_attribs = [egl::CONTEXT_CLIENT_VERSION, client_version, egl::NONE];
        self.instance
            .create_context(display, config, None, &context_attribs)
            .map_err(|err| egl_failure("EGL context", err))
    }

    fn destroy_context(
        &self,
        display: egl::Display,
        context: egl::Context,
    ) -> Result<(), ProbeError> {
        self.instance
            .destroy_context(display, context)
            .map_err(|err| egl_failure("EGL context", err))
    }

    fn make_current(
        &self,
        display: egl::Display,
        context: Option<egl::Context>,
    ) -> Result<(), ProbeError> {
        self.instance
            .make_current(display, None, None, context)
            .map_err(|err| egl_failure("EGL current context", err))
    }

    fn gl_string(&self, name: GlString) -> Option<String> {
        let proc = self.instance.get_proc_address("glGetString")?;
        // SAFETY: glGetString has this signature on every GL/GLES implementation
        let gl_get_string: GlGetString = unsafe { std::mem::transmute(proc) };
        // SAFETY: a context is current; the result is null or a static NUL-terminated string
        unsafe {
            let value = gl_get_string(name.raw());
            if value.is_null() {
                None
            } else {
                Some(
                    CStr::from_ptr(value as *const c_char)
                        .to_string_lossy()
                        .into_owned(),
                )
            }
        }
    }
}

/// An initialized EGL display, terminated when released or dropped
pub struct EglSession<'a, E: EglApi> {
    api: &'a E,
    display: Option<E::Display>,
    version: (i32, i32),
}

impl<'a, E: EglApi> EglSession<'a, E> {
    /// Get and initialize the default display
    pub fn new(api: &'a E) -> Result<Self, ProbeError> {
        let display = api
            .default_display()
            .ok_or_else(|| ProbeError::acquisition("EGL display", "no default display"))?;
        let version = api.initialize(display)?;
        debug!("EGL {}.{} display initialized", version.0, version.1);

        Ok(Self {
            api,
            display: Some(display),
            version,
        })
    }

    /// EGL version reported by `eglInitialize`
    pub fn version(&self) -> (i32, i32) {
        self.version
    }

    pub fn query(&self, name: EglString) -> Option<String> {
        self.api.query_string(self.display?, name)
    }

    /// Terminate the display; later calls do nothing
    pub fn release(&mut self) {
        if let Some(display) = self.display.take() {
            match self.api.terminate(display) {
                Ok(()) => debug!("EGL display terminated"),
                Err(err) => warn!("Failed to terminate EGL display: {}", err),
            }
        }
    }
}

impl<E: EglApi> Drop for EglSession<'_, E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A rendering context on a session's display
pub struct EglContext<'s, 'a, E: EglApi> {
    session: &'s EglSession<'a, E>,
    context: Option<E::Context>,
}

impl<'s, 'a, E: EglApi> EglContext<'s, 'a, E> {
    pub fn new(session: &'s EglSession<'a, E>, client_version: i32) -> Result<Self, ProbeError> {
        let display = session
            .display
            .ok_or_else(|| ProbeError::acquisition("EGL context", "display already terminated"))?;
        let context = session.api.create_context(display, client_version)?;

        Ok(Self {
            session,
            context: Some(context),
        })
    }

    pub fn make_current(&self) -> Result<(), ProbeError> {
        match (self.session.display, self.context) {
            (Some(display), Some(context)) => self.session.api.make_current(display, Some(context)),
            _ => Err(ProbeError::acquisition("EGL current context", "context released")),
        }
    }

    /// Unbind whatever context is current on the display
    pub fn unbind(&self) {
        if let Some(display) = self.session.display {
            if let Err(err) = self.session.api.make_current(display, None) {
                warn!("Failed to unbind EGL context: {}", err);
            }
        }
    }

    /// Destroy the context; later calls do nothing
    pub fn release(&mut self) {
        if let (Some(display), Some(context)) = (self.session.display, self.context.take()) {
            match self.session.api.destroy_context(display, context) {
                Ok(()) => debug!("EGL context destroyed"),
                Err(err) => warn!("Failed to destroy EGL context: {}", err),
            }
        }
    }
}

impl<E: EglApi> Drop for EglContext<'_, '_, E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Load libEGL and read the default display's properties
pub fn egl_information(config: &EglConfig) -> Option<EglInformation> {
    match LoadedEgl::load() {
        Ok(egl) => query_egl_information(&egl, config),
        Err(ProbeError::Unsupported(what)) => {
            info!("{} is not available", what);
            None
        }
        Err(err) => {
            error!("Failed to load EGL: {}", err);
            None
        }
    }
}

/// Read EGL strings, then GL strings through a surfaceless context
pub fn query_egl_information<E: EglApi>(api: &E, config: &EglConfig) -> Option<EglInformation> {
    let session = match EglSession::new(api) {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to initialize EGL: {}", err);
            return None;
        }
    };

    let mut information = EglInformation {
        egl_vendor: session.query(EglString::Vendor),
        // Some drivers leave EGL_VERSION empty; eglInitialize always reports one
        egl_version: session.query(EglString::Version).or_else(|| {
            let (major, minor) = session.version();
            Some(format!("{}.{}", major, minor))
        }),
        egl_extensions: session.query(EglString::Extensions).map(|s| split_list(&s)),
        egl_client_apis: session.query(EglString::ClientApis).map(|s| split_list(&s)),
        gl: None,
    };

    if config.query_gl {
        information.gl = query_gl_information(&session, config.gl_client_version);
    }

    Some(information)
}

fn query_gl_information<E: EglApi>(
    session: &EglSession<'_, E>,
    client_version: i32,
) -> Option<GlInformation> {
    let context = match EglContext::new(session, client_version) {
        Ok(context) => context,
        Err(err) => {
            error!("Failed to create EGL context: {}", err);
            return None;
        }
    };

    if let Err(err) = context.make_current() {
        error!("Failed to make EGL context current: {}", err);
        return None;
    }

    let api = session.api;
    let gl = GlInformation {
        gl_vendor: api.gl_string(GlString::Vendor),
        gl_renderer: api.gl_string(GlString::Renderer),
        gl_version: api.gl_string(GlString::Version),
        gl_extensions: api.gl_string(GlString::Extensions).map(|s| split_list(&s)),
    };
    context.unbind();

    Some(gl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Scriptable EGL that records every call
    #[derive(Default)]
    struct FakeEgl {
        no_display: bool,
        fail_initialize: bool,
        fail_context: bool,
        fail_make_current: bool,
        no_version_string: bool,
        current: Cell<Option<u32>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeEgl {
        fn record(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.as_str() == call).count()
        }
    }

    impl EglApi for FakeEgl {
        type Display = u32;
        type Context = u32;

        fn default_display(&self) -> Option<u32> {
            self.record("get_display");
            (!self.no_display).then_some(1)
        }

        fn initialize(&self, _display: u32) -> Result<(i32, i32), ProbeError> {
            self.record("initialize");
            if self.fail_initialize {
                Err(ProbeError::acquisition("EGL display", "EGL_NOT_INITIALIZED"))
            } else {
                Ok((1, 5))
            }
        }

        fn terminate(&self, _display: u32) -> Result<(), ProbeError> {
            self.record("terminate");
            Ok(())
        }

        fn query_string(&self, _display: u32, name: EglString) -> Option<String> {
            match name {
                EglString::Vendor => Some("Mesa Project".to_string()),
                EglString::Version if self.no_version_string => None,
                EglString::Version => Some("1.5 Mesa".to_string()),
                EglString::Extensions => {
                    Some("EGL_KHR_surfaceless_context EGL_KHR_fence_sync".to_string())
                }
                EglString::ClientApis => Some("OpenGL OpenGL_ES ".to_string()),
            }
        }

        fn create_context(&self, _display: u32, client_version: i32) -> Result<u32, ProbeError> {
            self.record(format!("create_context {}", client_version));
            if self.fail_context {
                Err(ProbeError::acquisition("EGL config", "no matching config"))
            } else {
                Ok(7)
            }
        }

        fn destroy_context(&self, _display: u32, _context: u32) -> Result<(), ProbeError> {
            self.record("destroy_context");
            Ok(())
        }

        fn make_current(&self, _display: u32, context: Option<u32>) -> Result<(), ProbeError> {
            self.record(match context {
                Some(_) => "make_current",
                None => "unbind",
            });
            if context.is_some() && self.fail_make_current {
                return Err(ProbeError::acquisition("EGL current context", "EGL_BAD_MATCH"));
            }
            self.current.set(context);
            Ok(())
        }

        fn gl_string(&self, name: GlString) -> Option<String> {
            self.current.get()?;
            Some(
                match name {
                    GlString::Vendor => "AMD",
                    GlString::Renderer => "AMD Radeon RX 6800 (radeonsi)",
                    GlString::Version => "OpenGL ES 3.2 Mesa 23.2.1",
                    GlString::Extensions => "GL_OES_EGL_image GL_EXT_color_buffer_float",
                }
                .to_string(),
            )
        }
    }

    #[test]
    fn test_full_information() {
        let egl = FakeEgl::default();
        let info = query_egl_information(&egl, &EglConfig::default()).unwrap();

        assert_eq!(info.egl_vendor.as_deref(), Some("Mesa Project"));
        assert_eq!(info.egl_version.as_deref(), Some("1.5 Mesa"));
        assert_eq!(
            info.egl_extensions,
            Some(vec![
                "EGL_KHR_surfaceless_context".to_string(),
                "EGL_KHR_fence_sync".to_string()
            ])
        );
        assert_eq!(
            info.egl_client_apis,
            Some(vec!["OpenGL".to_string(), "OpenGL_ES".to_string()])
        );

        let gl = info.gl.unwrap();
        assert_eq!(gl.gl_renderer.as_deref(), Some("AMD Radeon RX 6800 (radeonsi)"));
        assert_eq!(gl.gl_extensions.map(|e| e.len()), Some(2));

        assert_eq!(
            egl.calls(),
            vec![
                "get_display",
                "initialize",
                "create_context 2",
                "make_current",
                "unbind",
                "destroy_context",
                "terminate"
            ]
        );
        assert_eq!(egl.current.get(), None);
    }

    #[test]
    fn test_version_falls_back_to_initialize_result() {
        let egl = FakeEgl {
            no_version_string: true,
            ..Default::default()
        };
        let info = query_egl_information(&egl, &EglConfig::default()).unwrap();

        assert_eq!(info.egl_version.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_no_display_yields_nothing() {
        let egl = FakeEgl {
            no_display: true,
            ..Default::default()
        };
        assert!(query_egl_information(&egl, &EglConfig::default()).is_none());
        assert_eq!(egl.count("terminate"), 0);
    }

    #[test]
    fn test_failed_initialize_yields_no_session() {
        let egl = FakeEgl {
            fail_initialize: true,
            ..Default::default()
        };
        assert!(EglSession::new(&egl).is_err());
        assert!(query_egl_information(&egl, &EglConfig::default()).is_none());
        assert_eq!(egl.count("terminate"), 0);
    }

    #[test]
    fn test_context_failure_keeps_egl_information() {
        let egl = FakeEgl {
            fail_context: true,
            ..Default::default()
        };
        let info = query_egl_information(&egl, &EglConfig::default()).unwrap();

        assert_eq!(info.egl_vendor.as_deref(), Some("Mesa Project"));
        assert!(info.gl.is_none());
        assert_eq!(egl.count("destroy_context"), 0);
        assert_eq!(egl.count("terminate"), 1);
    }

    #[test]
    fn test_make_current_failure_still_destroys_context() {
        let egl = FakeEgl {
            fail_make_current: true,
            ..Default::default()
        };
        let info = query_egl_information(&egl, &EglConfig::default()).unwrap();

        assert!(info.gl.is_none());
        assert_eq!(egl.count("destroy_context"), 1);
        assert_eq!(egl.count("terminate"), 1);
    }

    #[test]
    fn test_gl_query_can_be_disabled() {
        let egl = FakeEgl::default();
        let config = EglConfig {
            query_gl: false,
            ..Default::default()
        };
        let info = query_egl_information(&egl, &config).unwrap();

        assert!(info.gl.is_none());
        assert_eq!(egl.count("create_context 2"), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let egl = FakeEgl::default();
        let mut session = EglSession::new(&egl).unwrap();
        assert_eq!(session.version(), (1, 5));

        {
            let mut context = EglContext::new(&session, 3).unwrap();
            context.release();
            context.release();
        }
        assert_eq!(egl.count("destroy_context"), 1);

        session.release();
        session.release();
        assert!(session.query(EglString::Vendor).is_none());
        drop(session);
        assert_eq!(egl.count("terminate"), 1);
    }
}
