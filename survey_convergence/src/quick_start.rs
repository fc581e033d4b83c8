/*!

# Quick start with LimeSurvey

This example runs a convergence report end to end on a snowball survey collected with LimeSurvey.

In a snowball survey, every respondent receives a personal code (`unique`) at the end of the questionnaire and
passes it on to the next people they invite. These people enter it as their `ref` when they answer. A few
respondents, the seeds, are recruited directly and receive a seed code such as `sd01` as their `ref`. The question
this tool answers is: for the respondents recruited from a given seed, have the answers to a question settled
down, or would more responses still move them?

**Exporting the structure** In the survey administration, use `Display/Export` then `Survey structure (.lss)`.
This file holds the questions, sub-questions and answers, in every language of the survey.

**Exporting the responses** Use `Responses` then `Export`, with the following options:
- Completion state: completed responses only
- Headings: question code
- Responses: answer code, with Y/N converted to 1/0
- Format: CSV (or Microsoft Excel)

The header of the CSV file then looks like:

```text
id,submitdate,lastpage,startlanguage,seed,ref,unique,city,gender,tools [SQ001],tools [SQ002],...
```

Run `seedplot` with the following command (the names of the files may differ for you).

```bash
seedplot --structure limesurvey_survey_228555.lss --responses results-survey228555.csv \
  --question city --seeds sd01 --seeds sd02 --seeds '*' --format text
```

The seed `*` gathers everyone who was not recruited through `sd01` or `sd02`. The kind of aggregation
follows the type of the question in the survey structure: `city` is a list question, so the shares of
its answers are followed row after row. The program should print something like:

```text
[2022-10-21T09:55:59Z INFO  survey_convergence] analyze_question: "city" (qid 10) as radio over 412 rows
[2022-10-21T09:55:59Z INFO  survey_convergence::grouping] SeedGrouper: 412 rows, 27 groups (Incremental policy)

city (radio): Which city do you live in?
seed sd01 (148 respondents)
     61.5%  North
     38.5%  South
seed sd02 (97 respondents)
     22.7%  North
     77.3%  South
seed * (167 respondents)
     40.1%  North
     59.9%  South
```

With `--format json` (the default), the full trajectories are written instead, one value per response.
They can be plotted with any tool: a curve that flattens out means that this seed has collected enough
responses for this question.

**Other reports** `--report arrival` counts the responses of each seed per half hour, and
`--report interview-length` gives the histogram of the time spent on the questionnaire.

**Going further** Writing all the options on the command line quickly gets tedious. They can be stored
in a configuration file, see the [configuration section](../manual/index.html#configuration).

*/
