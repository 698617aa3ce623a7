/// Shown when a page loads without a usable fragment.
pub const DEFAULT_DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Document</title>
</head>
<body>
  <button onclick="showConfetti()">Click me!</button>
</body>
<script type="module">
  import confetti from "canvas-confetti";
  globalThis.showConfetti = () => { confetti(); console.log("Confetti!"); }
</script>
</html>"#;
