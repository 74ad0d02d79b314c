/// Newline-joined report, terminated by a final newline.
pub fn render(lines: &[String]) -> Vec<u8> {
    let mut out = lines.join("\n");
    out.push('\n');
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_and_terminates() {
        let lines = vec!["a".to_string(), String::new(), "b".to_string()];
        assert_eq!(render(&lines), b"a\n\nb\n".to_vec());
    }
}
