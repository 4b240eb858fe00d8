//! Scripts registered with `Page.addScriptToEvaluateOnNewDocument` so they
//! run before any site script on every navigation.

pub(crate) const STEALTH_SCRIPTS: &[&str] = &[
    // navigator.webdriver is the first thing bot walls check.
    r"
    Object.defineProperty(Navigator.prototype, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    ",
    r"
    if (!window.chrome) {
        window.chrome = { runtime: {}, loadTimes: function() {}, csi: function() {}, app: {} };
    }
    ",
    r"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    ",
    r"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
            { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
        ],
        configurable: true
    });
    ",
    r"
    if (window.navigator.permissions && window.navigator.permissions.query) {
        const query = window.navigator.permissions.query.bind(window.navigator.permissions);
        window.navigator.permissions.query = (params) => (
            params && params.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : query(params)
        );
    }
    ",
    r"
    (() => {
        const patch = (proto) => {
            if (!proto) return;
            const original = proto.getParameter;
            proto.getParameter = function(param) {
                if (param === 37445) return 'Intel Inc.';
                if (param === 37446) return 'Intel Iris OpenGL Engine';
                return original.call(this, param);
            };
        };
        patch(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
        patch(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
    })();
    ",
    r"
    for (const key of Object.keys(window)) {
        if (key.startsWith('cdc_')) { delete window[key]; }
    }
    ",
];

/// Resolves once resource entries stop growing for a second, or after
/// `{timeout_ms}`. Network-idle is inferred from the Resource Timing API
/// because CDP lifecycle events are not surfaced through the page handle.
pub(crate) fn network_idle_script(timeout_ms: u64) -> String {
    format!(
        r"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = 1000;
            const interval = 250;
            const start = Date.now();
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            let last = count();
            let stable = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const current = count();
                if (document.readyState === 'complete' && current === last) {{
                    stable += interval;
                    if (stable >= idleMs) return true;
                }} else {{
                    stable = 0;
                }}
                last = current;
            }}
            return false;
        }})()"
    )
}

/// HTTP status of the current document from Navigation Timing, or `null`.
pub(crate) const RESPONSE_STATUS_SCRIPT: &str = r"(() => {
    try {
        const nav = performance.getEntriesByType('navigation')[0];
        return nav && nav.responseStatus ? nav.responseStatus : null;
    } catch (_) {
        return null;
    }
})()";

/// Called on an element: its own `checked` state, or that of a checkbox or
/// radio inside it (labels wrap their inputs on listing facets).
pub(crate) const IS_CHECKED_FN: &str = r"function() {
    if (this.checked === true) return true;
    const input = this.querySelector
        ? this.querySelector('input[type=checkbox], input[type=radio]')
        : null;
    if (input) return input.checked === true;
    if (this.htmlFor) {
        const target = document.getElementById(this.htmlFor);
        return !!(target && target.checked);
    }
    return false;
}";
