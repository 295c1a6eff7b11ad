//! Tool executor
//!
//! Flat dispatch table from tool name to handler. Handlers that take a `ref`
//! resolve it through the session first and fail with "Element not found"
//! when it is stale or unknown.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use nw_core::ToolOutput;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::console::{ConsoleCapture, ConsoleLevel};
use crate::dom::{Dom, ElementId};
use crate::error::{ExecError, Result};
use crate::events::{EventSynthesizer, MouseButton};
use crate::host::HostWindow;
use crate::session::Session;

/// Timing knobs for the asynchronous handlers
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Give up on `browser_wait_for` after this long
    pub wait_timeout: Duration,
    /// How often `browser_wait_for` re-reads the page text
    pub poll_interval: Duration,
    /// Delay between replying and closing the window
    pub close_delay: Duration,
    /// Delay between spawning the new instance and closing this one
    pub relaunch_close_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            close_delay: Duration::from_millis(100),
            relaunch_close_delay: Duration::from_millis(30),
        }
    }
}

/// `fullPage` is accepted but the host always captures the visible page.
#[derive(Debug, Deserialize)]
struct ScreenshotArgs {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClickArgs {
    #[serde(rename = "ref")]
    reference: String,
    element: Option<String>,
    #[serde(default)]
    button: MouseButton,
    #[serde(default)]
    double_click: bool,
}

#[derive(Debug, Deserialize)]
struct TypeArgs {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    slowly: bool,
    #[serde(default)]
    submit: bool,
}

#[derive(Debug, Deserialize)]
struct EvaluateArgs {
    function: String,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavigateArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ConsoleArgs {
    #[serde(default)]
    level: ConsoleLevel,
}

#[derive(Debug, Deserialize)]
struct ResizeArgs {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaitForArgs {
    text: Option<String>,
    text_gone: Option<String>,
    time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FormField {
    #[serde(rename = "ref")]
    reference: String,
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct FillFormArgs {
    #[serde(default)]
    fields: Vec<FormField>,
}

#[derive(Debug, Deserialize)]
struct PressKeyArgs {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReloadArgs {
    #[serde(default)]
    ignore_cache: bool,
    #[serde(default)]
    relaunch: bool,
}

#[derive(Debug, Deserialize)]
struct SetBoundsArgs {
    x: Option<i32>,
    y: Option<i32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ZoomArgs {
    level: Option<f64>,
}

/// NW.js zoom level for a linear scale: 0 is 100%, each step is 20%.
pub fn zoom_level_for_scale(scale: f64) -> f64 {
    scale.ln() / 1.2_f64.ln()
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };
    serde_json::from_value(args).map_err(|e| ExecError::InvalidArguments(e.to_string()))
}

fn format_evaluated(result: Option<Value>) -> Result<String> {
    Ok(match result {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s,
        Some(value @ (Value::Object(_) | Value::Array(_))) => serde_json::to_string_pretty(&value)?,
        Some(scalar) => scalar.to_string(),
    })
}

pub struct ToolExecutor {
    dom: Arc<dyn Dom>,
    host: Option<Arc<dyn HostWindow>>,
    session: Session,
    events: EventSynthesizer,
    console: Arc<ConsoleCapture>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Executor over `dom`. Window tools fail with "NW.js API not available"
    /// until a host is attached.
    pub fn new(dom: Arc<dyn Dom>) -> Self {
        Self {
            session: Session::new(dom.clone()),
            events: EventSynthesizer::new(dom.clone()),
            dom,
            host: None,
            console: Arc::new(ConsoleCapture::new()),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_host(mut self, host: Arc<dyn HostWindow>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a console buffer the embedding already feeds.
    pub fn with_console(mut self, console: Arc<ConsoleCapture>) -> Self {
        self.console = console;
        self
    }

    pub fn console(&self) -> &Arc<ConsoleCapture> {
        &self.console
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<ToolOutput> {
        debug!("Executing tool {}", tool);
        match tool {
            "browser_snapshot" => Ok(ToolOutput::text(self.session.snapshot())),
            "browser_take_screenshot" => self.screenshot(parse(args)?).await,
            "browser_click" => self.click(parse(args)?),
            "browser_type" => self.type_text(parse(args)?),
            "browser_evaluate" => self.evaluate(parse(args)?),
            "browser_navigate" => {
                let args: NavigateArgs = parse(args)?;
                self.dom.navigate(&args.url);
                Ok(ToolOutput::text(format!("Navigating to: {}", args.url)))
            }
            "browser_console_messages" => {
                let args: ConsoleArgs = parse(args)?;
                let messages = self.console.messages(args.level);
                if messages.is_empty() {
                    Ok(ToolOutput::text("(no messages)"))
                } else {
                    Ok(ToolOutput::text(messages.join("\n")))
                }
            }
            "browser_resize" => {
                let args: ResizeArgs = parse(args)?;
                self.host()?.resize_to(args.width, args.height)?;
                Ok(ToolOutput::text(format!("Resized to {}x{}", args.width, args.height)))
            }
            "browser_wait_for" => self.wait_for(parse(args)?).await,
            "browser_fill_form" => self.fill_form(parse(args)?),
            "browser_press_key" => {
                let args: PressKeyArgs = parse(args)?;
                self.events.press_key(&args.key, None);
                Ok(ToolOutput::text(format!("Pressed: {}", args.key)))
            }
            "nwjs_reload" => self.reload(parse(args)?),
            "nwjs_show_devtools" => {
                self.host()?.show_devtools()?;
                Ok(ToolOutput::text("DevTools opened"))
            }
            "nwjs_close" => self.close(),
            "nwjs_get_manifest" => {
                let manifest = self.host()?.manifest()?;
                Ok(ToolOutput::text(serde_json::to_string_pretty(&manifest)?))
            }
            "nwjs_get_argv" => {
                let argv = self.host()?.argv()?;
                Ok(ToolOutput::text(serde_json::to_string_pretty(&argv)?))
            }
            "nwjs_minimize" => {
                self.host()?.minimize()?;
                Ok(ToolOutput::text("Window minimized"))
            }
            "nwjs_maximize" => {
                self.host()?.maximize()?;
                Ok(ToolOutput::text("Window maximized"))
            }
            "nwjs_restore" => {
                self.host()?.restore()?;
                Ok(ToolOutput::text("Window restored"))
            }
            "nwjs_focus" => {
                self.host()?.focus()?;
                Ok(ToolOutput::text("Window focused"))
            }
            "nwjs_get_bounds" => {
                let bounds = self.host()?.bounds()?;
                Ok(ToolOutput::text(serde_json::to_string_pretty(&bounds)?))
            }
            "nwjs_set_bounds" => self.set_bounds(parse(args)?),
            "nwjs_zoom" => self.zoom(parse(args)?),
            other => Err(ExecError::UnknownTool(other.to_string())),
        }
    }

    fn host(&self) -> Result<&Arc<dyn HostWindow>> {
        self.host.as_ref().ok_or(ExecError::HostUnavailable)
    }

    fn resolve(&self, reference: &str) -> Result<ElementId> {
        self.session
            .resolve(reference)
            .ok_or_else(|| ExecError::ElementNotFound(reference.to_string()))
    }

    async fn screenshot(&self, args: ScreenshotArgs) -> Result<ToolOutput> {
        let host = self.host()?;
        if let Some(reference) = &args.reference {
            self.resolve(reference)?;
        }
        let png = host.capture_page().await?;
        Ok(ToolOutput::image(BASE64.encode(png), "image/png"))
    }

    fn click(&self, args: ClickArgs) -> Result<ToolOutput> {
        let el = self.resolve(&args.reference)?;
        self.events.click(el, args.button, args.double_click);
        let label = args.element.unwrap_or(args.reference);
        Ok(ToolOutput::text(format!("Clicked: {}", label)))
    }

    fn type_text(&self, args: TypeArgs) -> Result<ToolOutput> {
        let el = self.resolve(&args.reference)?;
        self.events.type_text(el, &args.text, args.slowly, args.submit);
        Ok(ToolOutput::text(format!("Typed: {}", args.text)))
    }

    fn evaluate(&self, args: EvaluateArgs) -> Result<ToolOutput> {
        let el = args
            .reference
            .as_deref()
            .map(|reference| self.resolve(reference))
            .transpose()?;
        let result = self.dom.evaluate(&args.function, el)?;
        Ok(ToolOutput::text(format_evaluated(result)?))
    }

    async fn wait_for(&self, args: WaitForArgs) -> Result<ToolOutput> {
        // A zero time counts as absent and falls through to the text wait.
        if let Some(time) = args.time.filter(|t| *t != 0.0) {
            let duration = Duration::try_from_secs_f64(time)
                .map_err(|e| ExecError::InvalidArguments(format!("invalid time {}: {}", time, e)))?;
            tokio::time::sleep(duration).await;
            return Ok(ToolOutput::text(format!("Waited {} seconds", time)));
        }

        let text = args.text.filter(|t| !t.is_empty());
        let gone = args.text_gone.filter(|t| !t.is_empty());
        let target = match text.as_ref().or(gone.as_ref()) {
            Some(target) => target.clone(),
            None => {
                return Err(ExecError::InvalidArguments(
                    "one of text, textGone or time is required".to_string(),
                ))
            }
        };

        let mut elapsed = Duration::ZERO;
        loop {
            let page_text = self.dom.body().map(|b| self.dom.inner_text(b)).unwrap_or_default();
            if let Some(text) = &text {
                if page_text.contains(text.as_str()) {
                    return Ok(ToolOutput::text(format!("Found: {}", text)));
                }
            }
            if let Some(gone) = &gone {
                if !page_text.contains(gone.as_str()) {
                    return Ok(ToolOutput::text(format!("Gone: {}", gone)));
                }
            }

            elapsed += self.config.poll_interval;
            if elapsed >= self.config.wait_timeout {
                return Err(ExecError::WaitTimeout(target));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn fill_form(&self, args: FillFormArgs) -> Result<ToolOutput> {
        let mut filled = Vec::with_capacity(args.fields.len());
        for field in args.fields {
            let el = self
                .session
                .resolve(&field.reference)
                .ok_or_else(|| ExecError::FieldNotFound(field.reference.clone()))?;
            let value = match &field.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match field.field_type.as_str() {
                "checkbox" | "radio" => self.dom.set_checked(el, value == "true"),
                _ => {
                    self.dom.set_value(el, &value);
                    self.events.dispatch_input(el);
                }
            }
            filled.push(field.name);
        }
        Ok(ToolOutput::text(format!("Filled fields: {}", filled.join(", "))))
    }

    fn reload(&self, args: ReloadArgs) -> Result<ToolOutput> {
        let host = self.host()?;
        if args.relaunch {
            let host = Arc::clone(host);
            let spawn_delay = self.config.close_delay;
            let close_delay = self.config.relaunch_close_delay;
            tokio::spawn(async move {
                tokio::time::sleep(spawn_delay).await;
                if let Err(e) = host.relaunch() {
                    warn!("Relaunch failed: {}", e);
                    return;
                }
                tokio::time::sleep(close_delay).await;
                if let Err(e) = host.close() {
                    warn!("Failed to close window after relaunch: {}", e);
                }
            });
            return Ok(ToolOutput::text("Relaunching app..."));
        }

        host.reload(args.ignore_cache)?;
        let suffix = if args.ignore_cache { " (ignoring cache)" } else { "" };
        Ok(ToolOutput::text(format!("Reloading app{}", suffix)))
    }

    fn close(&self) -> Result<ToolOutput> {
        let host = Arc::clone(self.host()?);
        let delay = self.config.close_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = host.close() {
                warn!("Failed to close window: {}", e);
            }
        });
        Ok(ToolOutput::text("Closing app"))
    }

    fn set_bounds(&self, args: SetBoundsArgs) -> Result<ToolOutput> {
        let host = self.host()?;
        if let (Some(x), Some(y)) = (args.x, args.y) {
            host.move_to(x, y)?;
        }
        if let (Some(width), Some(height)) = (args.width, args.height) {
            host.resize_to(width, height)?;
        }
        let bounds = host.bounds()?;
        Ok(ToolOutput::text(format!(
            "Bounds updated: {}",
            serde_json::to_string(&bounds)?
        )))
    }

    fn zoom(&self, args: ZoomArgs) -> Result<ToolOutput> {
        let host = self.host()?;
        let level = args.level.unwrap_or(1.0);
        if !level.is_finite() || level <= 0.0 {
            return Err(ExecError::InvalidArguments(format!(
                "zoom level must be positive, got {}",
                level
            )));
        }
        host.set_zoom_level(zoom_level_for_scale(level))?;
        let percent = (level * 100.0 * 100.0).round() / 100.0;
        Ok(ToolOutput::text(format!("Zoom set to {}%", percent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zoom_level_for_scale() {
        assert!(zoom_level_for_scale(1.0).abs() < 1e-12);
        assert!((zoom_level_for_scale(1.2) - 1.0).abs() < 1e-12);
        assert!((zoom_level_for_scale(1.44) - 2.0).abs() < 1e-9);
        assert!(zoom_level_for_scale(0.5) < 0.0);
    }

    #[test]
    fn test_format_evaluated() {
        assert_eq!(format_evaluated(None).unwrap(), "undefined");
        assert_eq!(format_evaluated(Some(Value::Null)).unwrap(), "null");
        assert_eq!(format_evaluated(Some(json!("text"))).unwrap(), "text");
        assert_eq!(format_evaluated(Some(json!(42))).unwrap(), "42");
        assert_eq!(format_evaluated(Some(json!(true))).unwrap(), "true");
        assert_eq!(format_evaluated(Some(json!({"a": 1}))).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_parse_null_args_as_empty_object() {
        let args: ConsoleArgs = parse(Value::Null).unwrap();
        assert_eq!(args.level, ConsoleLevel::Info);
        let err = parse::<NavigateArgs>(json!({})).unwrap_err();
        assert!(matches!(err, ExecError::InvalidArguments(_)));
    }
}
