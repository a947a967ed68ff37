//! Automation-masking page patches.
//!
//! A fixed, versioned list of (target, override) pairs applied to every new
//! document via `Page.addScriptToEvaluateOnNewDocument`. The list is data, not
//! inline imperative code, so individual patches can be tested and extended
//! without touching the orchestration logic. Bump [`PATCH_SET_VERSION`] when
//! a patch is added, removed, or its observable behavior changes.

/// One property override injected into every new page.
#[derive(Debug, Clone, Copy)]
pub struct PagePatch {
    /// The page-environment surface this patch masks.
    pub target: &'static str,
    /// Self-contained script applying the override. Must never throw.
    pub js: &'static str,
}

pub const PATCH_SET_VERSION: u32 = 4;

pub const PAGE_PATCHES: &[PagePatch] = &[
    PagePatch {
        target: "navigator.webdriver",
        // "absent" (undefined) reads more like a real browser than `false`.
        js: r#"
(() => {
    try {
        Object.defineProperty(Navigator.prototype, 'webdriver', {
            get: () => undefined,
            configurable: true,
        });
        delete navigator.webdriver;
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "navigator.plugins",
        js: r#"
(() => {
    try {
        Object.defineProperty(Navigator.prototype, 'plugins', {
            get: () => [1, 2, 3, 4, 5],
            configurable: true,
        });
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "navigator.languages",
        js: r#"
(() => {
    try {
        Object.defineProperty(Navigator.prototype, 'languages', {
            get: () => ['en-US', 'en'],
            configurable: true,
        });
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "window.chrome.runtime",
        js: r#"
(() => {
    try {
        if (!window.chrome) { window.chrome = {}; }
        if (!window.chrome.runtime) {
            window.chrome.runtime = {
                connect: function() { return { onDisconnect: { addListener: function() {} } }; },
                sendMessage: function() {},
            };
        }
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "navigator.permissions.query",
        js: r#"
(() => {
    try {
        const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
        if (originalQuery) {
            window.navigator.permissions.query = (parameters) => (
                (parameters.name === 'notifications' || parameters.name === 'geolocation')
                    ? Promise.resolve({ state: 'granted' })
                    : originalQuery(parameters)
            );
        }
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "WebGLRenderingContext.getParameter",
        // 37445 = UNMASKED_VENDOR_WEBGL, 37446 = UNMASKED_RENDERER_WEBGL.
        js: r#"
(() => {
    try {
        const getParameter = WebGLRenderingContext.prototype.getParameter;
        WebGLRenderingContext.prototype.getParameter = function(parameter) {
            if (parameter === 37445) return 'Intel Inc.';
            if (parameter === 37446) return 'Intel Iris OpenGL Engine';
            return getParameter.apply(this, arguments);
        };
        if (typeof WebGL2RenderingContext !== 'undefined') {
            const getParameter2 = WebGL2RenderingContext.prototype.getParameter;
            WebGL2RenderingContext.prototype.getParameter = function(parameter) {
                if (parameter === 37445) return 'Intel Inc.';
                if (parameter === 37446) return 'Intel Iris OpenGL Engine';
                return getParameter2.apply(this, arguments);
            };
        }
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "window.screen",
        js: r#"
(() => {
    try {
        const geometry = {
            width: 1920,
            height: 1080,
            availWidth: 1920,
            availHeight: 1080,
            colorDepth: 24,
            pixelDepth: 24,
        };
        for (const [key, value] of Object.entries(geometry)) {
            Object.defineProperty(Screen.prototype, key, {
                get: () => value,
                configurable: true,
            });
        }
    } catch (e) {}
})();
"#,
    },
    PagePatch {
        target: "automation globals",
        js: r#"
(() => {
    try {
        delete window.__playwright;
        delete window.__puppeteer;
        delete window.__selenium;
        delete window.callPhantom;
        delete window._phantom;
    } catch (e) {}
})();
"#,
    },
];

/// Assembles the full patch set into one script for injection.
pub fn stealth_script() -> String {
    let mut script = format!("// masking patch set v{}\n", PATCH_SET_VERSION);
    for patch in PAGE_PATCHES {
        script.push_str(patch.js);
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_patch_names_a_target_and_carries_a_script() {
        for patch in PAGE_PATCHES {
            assert!(!patch.target.is_empty());
            assert!(
                patch.js.contains("try"),
                "patch '{}' must be throw-safe",
                patch.target
            );
        }
    }

    #[test]
    fn targets_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for patch in PAGE_PATCHES {
            assert!(seen.insert(patch.target), "duplicate target: {}", patch.target);
        }
    }

    #[test]
    fn assembled_script_covers_the_known_surfaces() {
        let script = stealth_script();
        assert!(script.contains("webdriver"));
        assert!(script.contains("Intel Iris OpenGL Engine"));
        assert!(script.contains("1920"));
        assert!(script.contains("colorDepth"));
        assert!(script.contains(&format!("v{}", PATCH_SET_VERSION)));
    }

    #[test]
    fn screen_patch_matches_viewport_constants() {
        let screen = PAGE_PATCHES
            .iter()
            .find(|p| p.target == "window.screen")
            .expect("screen patch present");
        assert!(screen.js.contains(&super::super::launch::VIEWPORT_WIDTH.to_string()));
        assert!(screen.js.contains(&super::super::launch::VIEWPORT_HEIGHT.to_string()));
    }
}
