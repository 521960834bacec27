//! Tests for TSX to JSX conversion

use plasmic_code::{maybe_convert_tsx_to_jsx, tsx_to_jsx};

#[test]
fn converts_generated_skeleton() {
    let source = r#"import * as React from "react";
import type { Props } from "./types";
import { PlasmicButton, type DefaultButtonProps } from "./PlasmicButton"; // plasmic-import: b1/render
export interface ButtonProps extends DefaultButtonProps {}

function Button_(props: ButtonProps, ref: React.Ref<HTMLElement>) {
  return <PlasmicButton root={{ ref }} {...props} />;
}

const Button = React.forwardRef<HTMLElement, ButtonProps>(Button_);
export default Button;
"#;
    let out = tsx_to_jsx(source).unwrap();
    insta::assert_snapshot!(out, @r###"
    import * as React from "react";
    import { PlasmicButton } from "./PlasmicButton"; // plasmic-import: b1/render

    function Button_(props, ref) {
      return <PlasmicButton root={{ ref }} {...props} />;
    }

    const Button = React.forwardRef(Button_);
    export default Button;
    "###);
}

#[test]
fn class_members_lose_modifiers() {
    let out = tsx_to_jsx("class A<T> implements B {\n  private x: number = 1;\n}\n").unwrap();
    assert_eq!(out, "class A {\n  x = 1;\n}\n");
}

#[test]
fn syntax_errors_are_reported() {
    assert!(tsx_to_jsx("const = ;").is_err());
}

#[test]
fn jsx_file_names() {
    let (name, content) = maybe_convert_tsx_to_jsx("pages/index.tsx", "const a: number = 1;\n").unwrap();
    assert_eq!(name, "pages/index.jsx");
    assert_eq!(content, "const a = 1;\n");
}
