// Prompt Builders
// Essay, rewrite and summary prompts sent to the LLM providers

use crate::models::{CitationFormat, EssayOptions, EssayStyle, PaperRecord, SummaryMode, NO_ABSTRACT};

/// System persona shared by essay generation and refinement.
pub const ESSAY_PERSONA: &str = "You are an expert academic essay writer. You write comprehensive, well-structured essays that properly cite sources and demonstrate deep analysis. Your writing is clear, engaging, and academically rigorous.";

const ABSTRACT_PREVIEW_CHARS: usize = 500;

pub struct CitationGuide {
    pub name: &'static str,
    pub in_text: &'static str,
    pub reference_example: &'static str,
}

pub fn citation_guide(format: CitationFormat) -> CitationGuide {
    match format {
        CitationFormat::Apa7 => CitationGuide {
            name: "APA 7th Edition",
            in_text: "(Author, Year) for paraphrasing or (Author, Year, p. X) for direct quotes",
            reference_example: "Author, A. A. (Year). Title of work. Publisher. https://doi.org/xxxxx",
        },
        CitationFormat::Mla9 => CitationGuide {
            name: "MLA 9th Edition",
            in_text: "(Author Page) - e.g., (Smith 45) or (Smith and Jones 23)",
            reference_example: "Author. \"Title of Article.\" Journal Name, vol. X, no. X, Year, pp. X-X.",
        },
        CitationFormat::Chicago => CitationGuide {
            name: "Chicago/Turabian",
            in_text: "Footnotes with superscript numbers¹ (notes-bibliography style) OR (Author Year, Page) for author-date style",
            reference_example: "Author. Title. Place: Publisher, Year.",
        },
        CitationFormat::Harvard => CitationGuide {
            name: "Harvard",
            in_text: "(Author Year) or (Author Year, p. X) for direct quotes",
            reference_example: "Author, A.A. Year. Title of work. City: Publisher.",
        },
        CitationFormat::Ieee => CitationGuide {
            name: "IEEE",
            in_text: "Numbered references in square brackets [1], [2], [3] in order of appearance",
            reference_example: "[1] A. Author, \"Title,\" Journal, vol. X, no. X, pp. X-X, Year.",
        },
        CitationFormat::Ama => CitationGuide {
            name: "AMA (American Medical Association)",
            in_text: "Superscript numbers¹²³ in order of appearance",
            reference_example: "1. Author AA. Title of article. Journal Name. Year;Volume(Issue):Pages.",
        },
    }
}

pub fn style_instruction(style: EssayStyle) -> &'static str {
    match style {
        EssayStyle::Academic => "Write in a formal academic tone with proper scholarly conventions. Use third person, passive voice where appropriate, and maintain objectivity.",
        EssayStyle::Argumentative => "Write a persuasive essay that takes a clear position and argues it convincingly with evidence. Use strong topic sentences and logical progression.",
        EssayStyle::Analytical => "Write an analytical essay that breaks down the topic into components, examines relationships, and provides deep insights. Focus on the \"how\" and \"why\".",
        EssayStyle::Expository => "Write an explanatory essay that clearly presents information and explains the topic. Be informative and educational.",
        EssayStyle::Narrative => "Write in a more engaging narrative style while maintaining academic credibility. Use storytelling elements where appropriate.",
    }
}

const HUMANIZE_BLOCK: &str = r#"

CRITICAL - HUMANIZE YOUR WRITING (avoid AI detection):
You MUST write in a way that appears naturally human-written and avoids common AI writing patterns:

1. AVOID THESE AI-FLAGGED PHRASES (never use them):
   - "It is important to note", "It is worth noting", "It should be noted"
   - "In today's world", "In the modern era", "In contemporary society"
   - "Plays a crucial role", "Plays an important role", "Plays a significant role"
   - "Delve into", "Dive deep", "Explore the intricacies"
   - "Comprehensive overview", "Holistic approach", "Multifaceted"
   - "Paramount", "Pivotal", "Underscores", "Myriad", "Plethora"
   - "Furthermore", "Moreover", "Additionally" (use sparingly, max 1-2 times total)
   - "In conclusion", "To summarize", "In summary" (find unique ways to conclude)

2. SENTENCE VARIETY (critical for human-like writing):
   - Mix short punchy sentences (5-10 words) with medium (15-20) and occasional long ones (25-35)
   - Start sentences differently - avoid starting multiple sentences with "This", "It", "The", or "There"
   - Use questions occasionally to engage the reader
   - Include a one-sentence paragraph for emphasis somewhere in the essay

3. VOCABULARY & STYLE:
   - Use contractions naturally (don't, isn't, won't, can't) - at least 3-5 times
   - Vary your word choices - don't repeat the same adjectives/adverbs
   - Use concrete, specific examples rather than abstract generalizations
   - Include occasional informal phrases that sound natural ("The truth is...", "Here's the thing:", "What's interesting is...")
   - Use active voice more than passive voice

4. STRUCTURE:
   - Don't make every paragraph the same length - vary between 3-7 sentences
   - Occasionally use a transitional phrase MID-sentence rather than at the start
   - Include at least one rhetorical question
   - Add a surprising fact, statistic, or counterintuitive point

5. NATURAL IMPERFECTIONS:
   - It's okay to start a sentence with "And" or "But" occasionally
   - Use em-dashes for asides—like this—instead of always using commas
   - Include a brief personal observation or interpretation (while citing sources)

Remember: Write like a knowledgeable human student, not a language model. Sound authentic and engaged with the topic.
"#;

fn source_block(index: usize, source: &PaperRecord) -> String {
    let year = source.year.map_or_else(|| "n.d.".to_string(), |y| y.to_string());
    let venue = if source.venue.trim().is_empty() {
        source.source_provider.label()
    } else {
        source.venue.as_str()
    };
    let mut block = format!(
        "Source {}:\n- Title: \"{}\"\n- Authors: {}\n- Year: {}\n- Venue: {}",
        index + 1,
        source.title,
        if source.authors.trim().is_empty() { "Unknown" } else { source.authors.as_str() },
        year,
        venue,
    );
    if !source.abstract_text.is_empty() && source.abstract_text != NO_ABSTRACT {
        let preview: String = source.abstract_text.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
        block.push_str(&format!("\n- Abstract: {}...", preview));
    }
    block
}

pub fn build_essay_prompt(topic: &str, sources: &[PaperRecord], options: &EssayOptions) -> String {
    let citation = citation_guide(options.citation_format);
    let sources_context = sources
        .iter()
        .enumerate()
        .map(|(i, s)| source_block(i, s))
        .collect::<Vec<_>>()
        .join("\n\n");
    let humanize = if options.humanize { HUMANIZE_BLOCK } else { "" };

    format!(
        r#"You are an expert academic writer. Write a comprehensive, well-researched essay on the following topic.

TOPIC/PROMPT:
{topic}

SOURCES TO CITE (you MUST incorporate ALL of these sources with proper in-text citations):
{sources_context}

REQUIREMENTS:
- Target length: approximately {target_words} words
- Style: {style} - {style_instruction}
- Citation format: {citation_name}
- In-text citation format: {in_text}
- Include proper in-text citations for EVERY source used
- Structure the essay with clear sections: Introduction, Body paragraphs (with subheadings for longer essays), and Conclusion
- The introduction should hook the reader, provide context, and present a clear thesis statement
- Each body paragraph should have a topic sentence, evidence from sources, analysis, and transition
- Synthesize and compare sources rather than just summarizing them one by one
- The conclusion should summarize key points, restate the thesis in light of evidence, and suggest implications or future directions
- End with a References/Works Cited/Bibliography section formatted in {citation_name}
- Reference format example: {reference_example}
{humanize}
IMPORTANT FORMATTING:
- Use markdown formatting for structure (# for title, ## for main sections, ### for subsections)
- Use **bold** for emphasis and *italics* for titles of works
- Write flowing, connected prose - not bullet points
- Ensure smooth transitions between paragraphs and sections
- Make the essay feel cohesive and well-argued, not like a collection of source summaries

Write the complete essay now:"#,
        topic = topic,
        sources_context = sources_context,
        target_words = options.length.target_words(),
        style = options.style.key(),
        style_instruction = style_instruction(options.style),
        citation_name = citation.name,
        in_text = citation.in_text,
        reference_example = citation.reference_example,
        humanize = humanize,
    )
}

pub fn build_refine_prompt(essay: &str) -> String {
    format!(
        r#"You are an expert editor specializing in making AI-written text sound more naturally human-written. Your task is to rewrite the following essay to avoid AI detection while preserving all the content, citations, and academic quality.

ORIGINAL ESSAY:
"""
{essay}
"""

REWRITE INSTRUCTIONS - You MUST apply ALL of these changes:

1. REMOVE/REPLACE AI-FLAGGED PHRASES:
   - Replace "It is important to note" → "Notice that" or "Consider this:" or just remove it
   - Replace "Furthermore/Moreover/Additionally" → "Also," "What's more," "Beyond this," or restructure the sentence
   - Replace "In conclusion" → "So what does this mean?" or "Looking at the bigger picture," or just transition naturally
   - Remove "plays a crucial/important role" → use specific verbs instead
   - Replace "In today's world/modern era" → be specific about time/context or remove
   - Replace "comprehensive/holistic" → "thorough" or "complete" or be specific
   - Never use: delve, myriad, plethora, paramount, pivotal, multifaceted, underscores

2. VARY SENTENCE STRUCTURE:
   - Add 2-3 very short sentences (5-8 words) for punch
   - Include 1-2 questions to engage the reader
   - Start at least 3 sentences with different words than "The," "This," "It," or "There"
   - Add one single-sentence paragraph for emphasis
   - Use em-dashes—like this—at least twice for asides

3. ADD NATURAL LANGUAGE ELEMENTS:
   - Include 4-6 contractions (don't, isn't, won't, can't, it's, that's)
   - Add 2-3 informal transitions ("Here's the thing:", "The truth is,", "What's interesting is")
   - Start 1-2 sentences with "And" or "But"
   - Include a brief personal interpretation (while still citing sources)

4. IMPROVE FLOW:
   - Vary paragraph lengths (some 3 sentences, some 5-6)
   - Move some transitions to mid-sentence instead of the start
   - Make the conclusion feel like a natural ending, not a formulaic wrap-up

5. KEEP THESE INTACT:
   - All citations and references (keep exact format)
   - The main arguments and thesis
   - Section headings and structure
   - Academic credibility and factual accuracy

OUTPUT FORMAT:
- Use the same markdown formatting as the original
- Keep all citations exactly as they were
- Maintain approximately the same length (±10%)

Now rewrite the essay to sound more naturally human while keeping all the academic content:"#,
        essay = essay
    )
}

fn summary_instruction(mode: SummaryMode) -> &'static str {
    match mode {
        SummaryMode::Bullets => "Summarize the following academic text into 4-6 clear bullet points. Each bullet should capture a key finding, concept, or conclusion. Be concise but preserve important details and any statistics/numbers mentioned.\n\nFormat your response as a bullet list with each point on a new line starting with \"• \"",
        SummaryMode::Paragraph => "Write a clear, concise paragraph summarizing the following academic text. The summary should be approximately 3-5 sentences and capture the main argument, key findings, and conclusions. Maintain an academic tone but make it accessible.",
        SummaryMode::Eli5 => "Explain the following academic text in simple terms that a 10-year-old could understand. Avoid jargon, use analogies where helpful, and focus on the main idea. Keep it friendly and engaging while still being accurate. Use 2-3 short paragraphs.",
    }
}

pub fn build_summary_prompt(text: &str, mode: SummaryMode) -> String {
    format!(
        "{}\n\nTEXT TO SUMMARIZE:\n\"\"\"\n{}\n\"\"\"\n\nProvide only the summary, no additional commentary.",
        summary_instruction(mode),
        text
    )
}
