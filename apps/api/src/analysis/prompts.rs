// All LLM prompt constants for the exam analysis pipeline.
// Each `*_PROMPT_TEMPLATE` has `{placeholder}` slots filled by `analysis::pipeline`.

/// Stage 1 system prompt: syllabus parser.
pub const SYLLABUS_SYSTEM: &str = "\
    You are a syllabus parser. Parse the given text to determine the subject and its syllabus. \
    Always respond in a well-structured format including all 5 units and their detailed topics.";

/// Stage 1 prompt. Replace `{syllabus_text}` before sending.
pub const SYLLABUS_PROMPT_TEMPLATE: &str =
    "Parse and structure this syllabus content:\n\n{syllabus_text}";

/// Stage 2 system prompt: question paper parser.
pub const QUESTION_PAPER_SYSTEM: &str = "\
    You are a question paper parser. Parse the given JSON object to detect the questions \
    from each section of every paper. \
    Return a structured mapping with the paper key as key and that paper's questions as value. \
    Return the questions only, exclude any other details such as instructions, \
    roll number boxes or invigilator notes.";

/// Stage 2 prompt. Replace `{question_papers}` with the JSON-rendered paper set.
pub const QUESTION_PAPER_PROMPT_TEMPLATE: &str =
    "Parse and structure these question papers:\n\n{question_papers}";

/// Stage 3 system prompt: exam analyser.
pub const ANALYSIS_SYSTEM: &str = "\
    You are an exam analyser. Use the syllabus of the subject to analyse past question papers \
    and determine the most important and frequently asked topics from each unit. \
    Always respond in a structured format: Unit Name: important topics. \
    Always include the number of times each topic has appeared in the question papers.";

/// Stage 3 prompt. Replace `{syllabus_structure}` and `{question_history}`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyse the following:

Syllabus structure:
{syllabus_structure}

Question paper history:
{question_history}

Provide analysis of important topics and their frequency."#;

/// Stage 4 system prompt: question generator.
pub const GENERATION_SYSTEM: &str = "\
    You are an exam question generator. \
    Generate 10-15 probable questions for the upcoming exam based on the analysis of past papers \
    and important topics. \
    Include both short answer (2 marks) and long answer (10 marks) questions. \
    Focus on frequently tested topics and important concepts. \
    Format the output as a proper model question paper in markdown. \
    Ensure questions are unique and not directly copied from past papers. \
    Refer to the type and quality of questions from the previous year question papers provided. \
    Mark the weightage (2/10 marks) clearly for each question.";

/// Stage 4 prompt. Replace `{question_patterns}` and `{topic_analysis}`.
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Based on the following information:

Question paper patterns:
{question_patterns}

Topic frequency analysis:
{topic_analysis}

Generate a model question paper with 10-15 questions following these guidelines:
1. Include both short answer (2 marks) and long answer (10 marks) questions
2. Focus on topics that appear frequently in past papers
3. Cover important topics from all units
4. Include theoretical and practical questions
5. Format as a proper question paper with sections and marks"#;
