//! Line protocol between the Rust driver and the Node.js Playwright bridge.
//!
//! Requests are single JSON lines on the bridge's stdin. Every answer is a
//! stdout line starting with [`RESULT_MARKER`]; anything else the bridge or
//! Playwright prints is noise and only logged.

use crate::{BrowserCookie, ElementState, WaitUntil};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const RESULT_MARKER: &str = "__PBLINK_BRIDGE__=";

/// Id of the readiness line the bridge prints once the page exists.
pub(crate) const HANDSHAKE_ID: i64 = 0;

#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    pub id: i64,
    #[serde(flatten)]
    pub command: Command<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum Command<'a> {
    InitScript {
        source: &'a str,
        arg: &'a Value,
    },
    AddCookies {
        cookies: &'a [BrowserCookie],
    },
    Goto {
        url: &'a str,
        wait_until: WaitUntil,
        timeout_ms: u64,
    },
    Url,
    WaitFor {
        selector: &'a str,
        state: ElementState,
        timeout_ms: u64,
    },
    Click {
        selector: &'a str,
        timeout_ms: u64,
    },
    Hover {
        selector: &'a str,
        timeout_ms: u64,
    },
    Fill {
        selector: &'a str,
        text: &'a str,
        timeout_ms: u64,
    },
    Press {
        key: &'a str,
    },
    Evaluate {
        source: &'a str,
        arg: &'a Value,
    },
    Screenshot {
        path: String,
        full_page: bool,
    },
    Cookies,
    LocalStorage,
    Close,
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitScript { .. } => "init_script",
            Command::AddCookies { .. } => "add_cookies",
            Command::Goto { .. } => "goto",
            Command::Url => "url",
            Command::WaitFor { .. } => "wait_for",
            Command::Click { .. } => "click",
            Command::Hover { .. } => "hover",
            Command::Fill { .. } => "fill",
            Command::Press { .. } => "press",
            Command::Evaluate { .. } => "evaluate",
            Command::Screenshot { .. } => "screenshot",
            Command::Cookies => "cookies",
            Command::LocalStorage => "local_storage",
            Command::Close => "close",
        }
    }

    /// Time the bridge itself may spend on the command, if it carries one.
    pub fn own_timeout_ms(&self) -> Option<u64> {
        match self {
            Command::Goto { timeout_ms, .. }
            | Command::WaitFor { timeout_ms, .. }
            | Command::Click { timeout_ms, .. }
            | Command::Hover { timeout_ms, .. }
            | Command::Fill { timeout_ms, .. } => Some(*timeout_ms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Response {
    pub id: i64,
    pub ok: bool,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Parse a bridge stdout line. `None` means the line is not a protocol answer.
pub(crate) fn parse_response_line(line: &str) -> Option<Response> {
    let rest = line.strip_prefix(RESULT_MARKER)?;
    serde_json::from_str::<Response>(rest.trim()).ok()
}

/// Generate the bridge program. Launch options arrive as `argv[2]`.
pub(crate) fn build_bridge_script() -> String {
    let mut script = String::new();
    script.push_str("import path from 'node:path';\n");
    script.push_str("import readline from 'node:readline';\n");
    script.push_str("import { createRequire } from 'node:module';\n\n");
    script.push_str(&format!("const RESULT_MARKER = '{}';\n", RESULT_MARKER));
    script.push_str("const options = JSON.parse(process.argv[2] ?? '{}');\n\n");

    script.push_str("function emit(id, ok, payload) {\n");
    script.push_str("  const body = ok ? { id, ok, value: payload ?? null } : { id, ok, error: String(payload) };\n");
    script.push_str("  process.stdout.write(`${RESULT_MARKER}${JSON.stringify(body)}\\n`);\n");
    script.push_str("}\n\n");
    script.push_str("function describe(error) {\n");
    script.push_str("  return error && error.message ? error.message : String(error);\n");
    script.push_str("}\n\n");
    script.push_str("function invoke(source, arg) {\n");
    script.push_str("  return `(${source})(${JSON.stringify(arg ?? null)})`;\n");
    script.push_str("}\n\n");

    // Resolve playwright from the working directory, not from the temp dir
    // holding this file.
    script.push_str("let chromium;\n");
    script.push_str("try {\n");
    script.push_str("  const require = createRequire(path.join(process.cwd(), 'pblink-bridge.cjs'));\n");
    script.push_str("  ({ chromium } = require('playwright'));\n");
    script.push_str("} catch (error) {\n");
    script.push_str("  process.stderr.write(describe(error) + '\\n');\n");
    script.push_str(&format!(
        "  emit({}, false, 'playwright package not found: ' + describe(error));\n",
        HANDSHAKE_ID
    ));
    script.push_str("  process.exit(1);\n");
    script.push_str("}\n\n");

    script.push_str("let browser;\n");
    script.push_str("let context;\n");
    script.push_str("let page;\n");
    script.push_str("try {\n");
    script.push_str("  browser = await chromium.launch({ headless: options.headless ?? true, args: options.args ?? [] });\n");
    script.push_str("  context = await browser.newContext({\n");
    script.push_str("    viewport: options.viewport,\n");
    script.push_str("    userAgent: options.user_agent,\n");
    script.push_str("    locale: options.locale,\n");
    script.push_str("    timezoneId: options.timezone,\n");
    script.push_str("  });\n");
    script.push_str("  page = await context.newPage();\n");
    script.push_str("} catch (error) {\n");
    script.push_str(&format!("  emit({}, false, describe(error));\n", HANDSHAKE_ID));
    script.push_str("  await browser?.close().catch(() => {});\n");
    script.push_str("  process.exit(1);\n");
    script.push_str("}\n");
    script.push_str(&format!(
        "emit({}, true, {{ ready: true, version: browser.version() }});\n\n",
        HANDSHAKE_ID
    ));

    script.push_str("async function handle(cmd) {\n");
    script.push_str("  switch (cmd.op) {\n");
    script.push_str("    case 'init_script':\n");
    script.push_str("      await context.addInitScript({ content: invoke(cmd.source, cmd.arg) });\n");
    script.push_str("      return null;\n");
    script.push_str("    case 'add_cookies':\n");
    script.push_str("      await context.addCookies(cmd.cookies);\n");
    script.push_str("      return cmd.cookies.length;\n");
    script.push_str("    case 'goto':\n");
    script.push_str("      await page.goto(cmd.url, { waitUntil: cmd.wait_until, timeout: cmd.timeout_ms });\n");
    script.push_str("      return page.url();\n");
    script.push_str("    case 'url':\n");
    script.push_str("      return page.url();\n");
    script.push_str("    case 'wait_for':\n");
    script.push_str("      await page.locator(cmd.selector).first().waitFor({ state: cmd.state, timeout: cmd.timeout_ms });\n");
    script.push_str("      return null;\n");
    // Actions wait for actionability themselves; one call keeps the bridge
    // inside the command's own timeout.
    script.push_str("    case 'click':\n");
    script.push_str("      await page.locator(cmd.selector).first().click({ timeout: cmd.timeout_ms });\n");
    script.push_str("      return null;\n");
    script.push_str("    case 'hover':\n");
    script.push_str("      await page.locator(cmd.selector).first().hover({ timeout: cmd.timeout_ms });\n");
    script.push_str("      return null;\n");
    script.push_str("    case 'fill':\n");
    script.push_str("      await page.locator(cmd.selector).first().fill(cmd.text, { timeout: cmd.timeout_ms });\n");
    script.push_str("      return null;\n");
    script.push_str("    case 'press':\n");
    script.push_str("      await page.keyboard.press(cmd.key);\n");
    script.push_str("      return null;\n");
    script.push_str("    case 'evaluate':\n");
    script.push_str("      return await page.evaluate(invoke(cmd.source, cmd.arg));\n");
    script.push_str("    case 'screenshot':\n");
    script.push_str("      await page.screenshot({ path: cmd.path, fullPage: cmd.full_page });\n");
    script.push_str("      return cmd.path;\n");
    script.push_str("    case 'cookies':\n");
    script.push_str("      return await context.cookies();\n");
    script.push_str("    case 'local_storage':\n");
    script.push_str("      return await page.evaluate(() => Object.fromEntries(Object.entries(window.localStorage)));\n");
    script.push_str("    case 'close':\n");
    script.push_str("      await context.close().catch(() => {});\n");
    script.push_str("      await browser.close().catch(() => {});\n");
    script.push_str("      return null;\n");
    script.push_str("    default:\n");
    script.push_str("      throw new Error(`Unsupported bridge op: ${cmd.op}`);\n");
    script.push_str("  }\n");
    script.push_str("}\n\n");

    script.push_str("const input = readline.createInterface({ input: process.stdin });\n");
    script.push_str("for await (const line of input) {\n");
    script.push_str("  if (!line.trim()) continue;\n");
    script.push_str("  let cmd;\n");
    script.push_str("  try {\n");
    script.push_str("    cmd = JSON.parse(line);\n");
    script.push_str("  } catch (error) {\n");
    script.push_str("    emit(-1, false, 'invalid command: ' + describe(error));\n");
    script.push_str("    continue;\n");
    script.push_str("  }\n");
    script.push_str("  try {\n");
    script.push_str("    emit(cmd.id, true, await handle(cmd));\n");
    script.push_str("  } catch (error) {\n");
    script.push_str("    emit(cmd.id, false, describe(error));\n");
    script.push_str("  }\n");
    script.push_str("  if (cmd.op === 'close') break;\n");
    script.push_str("}\n\n");

    // stdin closed without an explicit close: still tear the browser down.
    script.push_str("await context.close().catch(() => {});\n");
    script.push_str("await browser.close().catch(() => {});\n");
    script.push_str("process.exit(0);\n");

    script
}
