/*!

This is the long-form manual for `survey_convergence` and `seedplot`.

## Input formats

Two inputs are needed: the structure of the survey and the responses.

### Survey structure

The survey structure is a LimeSurvey export (`.lss`, XML). Three of its
sections are read: `questions`, `subquestions` and `answers`. Each row of
these sections carries a `language` field, and only the rows in the
configured language are kept.

Required fields:
- questions: `qid`, `title` (the question name), `question` (the text),
  `type`, `mandatory`, `other`
- subquestions: `parent_qid`, `title`, `question`
- answers: `qid`, `code`, `answer`

The flags `mandatory` and `other` are `Y` or `N`. Any other value is an error.
Markup is removed from question texts, and only their last non-empty line is
kept.

### Responses

The responses are a table exported from LimeSurvey, either as CSV (`csv`) or
as an Excel workbook (`xlsx`). The first row is the header. Columns of
sub-questions are labeled `<question> [<sub-question>]`:

```text
id,submitdate,ref,unique,city,tools [SQ001],tools [SQ002],tools [其它],age,cityTime
1,2020-03-01 10:00:00,sd01,aaaa,A1,1,0,,34,12.5
2,2020-03-01 10:04:10,aaaa,bbbb,A2,0,1,Lantern,27,4.0
```

The columns `ref` (who referred this respondent) and `unique` (the
identifier of this respondent, handed down to the people they refer) are
mandatory. Rows whose `unique` does not have exactly 4 characters are
incomplete: they never start nor join a referral chain, but they still
count as responses of the chain of their `ref`.

Write-in columns (containing `其它`) and elapsed-time columns (ending in
`Time`) are never part of a question.

## Referral chains

Every configured main seed is analysed separately. The special seed `*`
stands for every chain that contains none of the other main seeds.

Two grouping policies are available:

- `incremental` (default): the rows are read once, in order. A row joins the
  first chain that already holds its `ref`, or starts a new chain. Two chains
  are never merged, so a chain that reaches another one only later in the
  table stays apart.

- `connected`: the chains are the connected components of the referral
  graph. This policy can merge chains that `incremental` keeps apart.

## Question kinds

| kind       | columns                  | output                                   |
|------------|--------------------------|------------------------------------------|
| `radio`    | one answer code per row  | share of each answer, row after row      |
| `checkbox` | one 0/1 column per option| share of each option, row after row      |
| `numeric`  | one number per row       | share of each bucket, row after row      |
| `array`    | one code per sub-question| share of each answer per sub-question    |

Shares are percentages. For `radio`, a blank answer is an answer of its own
when the question is optional or accepts a write-in. For `checkbox`, rows
with no option checked are skipped. For `numeric`, the answers are counted in
buckets of 5 from 10 to 69 (both included) and the answers out of that range
are skipped. For `array`, fully blank rows are skipped.

When a question is not listed in the configuration, its kind follows its type
in the survey structure: list and gender questions are `radio`, multiple
choice questions are `checkbox`, numerical input is `numeric` and the array
types are `array`.

## Configuration

`seedplot` reads a configuration file in JSON:

```text
{
  "outputSettings": {
    "surveyName": "Spring 2020",
    "outputFile": "city.json"
  },
  "structureFile": "survey.lss",
  "responseSource": {
    "provider": "csv",
    "filePath": "responses.csv"
  },
  "language": "en",
  "mainSeeds": ["sd01", "sd02", "*"],
  "rules": {
    "grouping": "incremental",
    "uniqueLength": 4,
    "bucketWidth": 5
  },
  "questions": {
    "city": "radio",
    "tools": "checkbox"
  },
  "timing": {
    "binSeconds": 1800
  }
}
```

All the paths are relative to the configuration file.

Fields of `responseSource`:
 - `provider` (string): `csv` or `xlsx`
 - `filePath` (string)
 - `excelWorksheetName` (string, optional): the worksheet to read. By default,
 the first one.

Fields of `rules`, all optional:
 - `grouping`: `incremental` or `connected`
 - `refColumn`, `uniqueColumn` (strings): the names of the referral columns
 - `uniqueLength` (number)
 - `otherMarker`, `elapsedSuffix` (strings)
 - `bucketWidth`, `bucketFloor`, `bucketCeiling` (numbers)

Fields of `timing`, all optional:
 - `submitColumn`, `timestampFormat` (a `chrono` format string), `binSeconds`:
 for the arrival report
 - `interviewColumn`, `interviewBins`: for the interview length report

 */
