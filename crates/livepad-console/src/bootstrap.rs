/// Classic script injected first into every rewritten document and installed
/// in every engine context. It wraps the native console methods and posts each
/// call to the parent as `[{method, data}]`, with arguments encoded so they
/// survive structured cloning and JSON.
pub const BOOTSTRAP_SCRIPT: &str = r#"(function () {
  if (window.__livepadHooked) return;
  window.__livepadHooked = true;
  var METHODS = ["log", "info", "warn", "error", "debug", "trace", "table", "dir",
    "assert", "count", "time", "timeEnd", "group", "groupCollapsed", "groupEnd", "clear"];
  var MAX_DEPTH = 6;
  function encode(value, seen, depth) {
    if (value === undefined) return { "@t": "undefined" };
    if (value === null || typeof value === "boolean" || typeof value === "string") return value;
    if (typeof value === "number") return isFinite(value) ? value : { "@t": "number", v: String(value) };
    if (typeof value === "bigint") return { "@t": "bigint", v: String(value) };
    if (typeof value === "symbol") return { "@t": "symbol", v: String(value) };
    if (typeof value === "function") return { "@t": "function", v: value.name || "anonymous" };
    if (value instanceof Error) return { "@t": "error", v: String(value.stack || value) };
    if (seen.indexOf(value) !== -1) return { "@t": "circular" };
    if (depth >= MAX_DEPTH) return { "@t": "object", v: Object.prototype.toString.call(value) };
    seen.push(value);
    var out;
    if (Array.isArray(value)) {
      out = value.map(function (item) { return encode(item, seen, depth + 1); });
    } else {
      out = {};
      Object.keys(value).forEach(function (key) { out[key] = encode(value[key], seen, depth + 1); });
    }
    seen.pop();
    return out;
  }
  var target = window.parent || window;
  METHODS.forEach(function (method) {
    var native = console[method];
    console[method] = function () {
      var args = Array.prototype.slice.call(arguments);
      try {
        target.postMessage([{ method: method, data: args.map(function (arg) { return encode(arg, [], 0); }) }], "*");
      } catch (e) {}
      if (typeof native === "function") return native.apply(console, arguments);
    };
  });
})();
"#;
