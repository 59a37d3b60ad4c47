use super::PaperAnalysis;

pub fn paper_header(ordinal: usize, title: &str) -> String {
    format!(
        "For paper number {}, titled {}, the knowledge graph of the abstract gives the following information:",
        ordinal, title
    )
}

/// Header, blank line, answer, blank line.
pub fn render_text(analysis: &PaperAnalysis) -> String {
    format!(
        "{}\n\n{}\n\n",
        paper_header(analysis.ordinal, &analysis.title),
        analysis.answer
    )
}

pub fn print_analysis(analysis: &PaperAnalysis) {
    print!("{}", render_text(analysis));
}

pub fn render_json(analyses: &[PaperAnalysis]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(analyses)
}
