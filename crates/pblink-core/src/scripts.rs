//! Page-side scripts. Each one is a function expression taking a single JSON
//! argument, the shape [`pblink_browser::PageDriver::evaluate`] and
//! [`pblink_browser::PageDriver::add_init_script`] expect.

/// Hide the usual automation fingerprints before any page script runs.
pub const STEALTH: &str = r#"(arg) => {
  try { Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined }); } catch (_) {}
  try {
    const langs = arg.languages;
    Object.defineProperty(Navigator.prototype, 'languages', { get: () => langs.slice() });
    Object.defineProperty(Navigator.prototype, 'language', { get: () => langs[0] });
  } catch (_) {}
  try {
    const fake = [
      { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
      { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
      { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' },
    ];
    const plugins = { length: fake.length, item(i) { return this[i]; }, namedItem(n) { return fake.find((p) => p.name === n) ?? null; } };
    fake.forEach((plugin, i) => { plugins[i] = plugin; });
    Object.defineProperty(Navigator.prototype, 'plugins', { get: () => plugins });
  } catch (_) {}
  try { window.chrome = window.chrome || { runtime: {} }; } catch (_) {}
}"#;

/// Seed localStorage on documents of the target domain only.
pub const SEED_LOCAL_STORAGE: &str = r#"(arg) => {
  try {
    if (!arg.domain || !window.location.hostname.includes(arg.domain)) return;
    for (const [key, value] of Object.entries(arg.entries)) {
      window.localStorage.setItem(key, value);
    }
  } catch (_) {}
}"#;

/// Fire the events frameworks listen to after a programmatic value change.
pub const DISPATCH_INPUT_EVENTS: &str = r#"(arg) => {
  const el = document.querySelector(arg.selector);
  if (!el) return false;
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
}"#;

/// Write a value straight into a form control, bypassing the widget.
/// Uses the native setter so React-controlled inputs notice the change.
pub const INJECT_VALUE: &str = r#"(arg) => {
  const el = document.querySelector(arg.selector);
  if (!el) return false;
  if (el.tagName === 'SELECT') {
    const option = Array.from(el.options).find((o) => o.text.trim() === arg.value || o.text.includes(arg.value));
    if (!option) return false;
    el.value = option.value;
  } else {
    const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value')?.set;
    if (setter) { setter.call(el, arg.value); } else { el.value = arg.value; }
  }
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
}"#;

/// Click the first visible element of the given tags whose trimmed text
/// equals `arg.text`, falling back to the first one that contains it.
/// Deepest match wins so wrappers are not clicked.
pub const SCAN_CLICK: &str = r#"(arg) => {
  const needle = arg.text.trim().toLowerCase();
  const textOf = (el) => (el.innerText || el.textContent || '').trim().toLowerCase();
  const visible = Array.from(document.querySelectorAll(arg.tags))
    .filter((el) => el.offsetParent !== null);
  const innermost = (list) => list.filter((el) => !list.some((other) => other !== el && el.contains(other)));
  const exact = innermost(visible.filter((el) => textOf(el) === needle));
  const partial = innermost(visible.filter((el) => textOf(el).includes(needle)));
  const hit = exact[0] ?? partial[0];
  if (!hit) return false;
  hit.scrollIntoView({ block: 'center' });
  hit.click();
  return true;
}"#;

pub const SCROLL_TO_BOTTOM: &str = r#"() => {
  window.scrollTo(0, document.body.scrollHeight);
  const panes = Array.from(document.querySelectorAll('[class*="scroll"], [class*="Scroll"]'));
  panes.forEach((pane) => { pane.scrollTop = pane.scrollHeight; });
  return true;
}"#;
