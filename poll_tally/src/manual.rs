/*!

This is the long-form manual for `poll_tally` and `boptally`.

## Input formats

The following formats are supported:
* `csv` survey exports from Google Forms and similar tools
* `xlsx` the same exports, saved as an Excel workbook

In both cases, the first row holds the questions and every other row holds the answers of one
respondent. The first column is usually the time of the response:

```text
Timestamp,Which color?,Rating
2024-01-01 10:00,"Red, Blue",5
2024-01-01 10:05,Red,4
```

### `csv`

Rows may have different lengths. The width of the table is the width of the first row: the
cells beyond it are ignored. Records that cannot be read are skipped with a warning.

### `xlsx`

The worksheet is selected with `excelWorksheetName` (or `--excel-worksheet-name`). By default
the first worksheet is read. Every cell is read as text.

## Analyses

### `ingest`

Produces the poll definitions that are published. Each question becomes one poll:
- the columns whose header starts with `Timestamp` or `Column` are skipped
- a multi-select answer (`Red, Blue`) counts once for each option
- the options that are not numbers and were chosen 3 times or fewer are removed. Numbers
  (as in rating scales) are always kept. The threshold is `pruneThreshold`.

The output has the shape stored in the content store:

```text
[
    {
        "question": "Rating",
        "results": [
            {
                "option": "5",
                "value": 1
            }
        ],
        "chart": "pie"
    }
]
```

### `questions`

The questions that can be analysed: the header without its first column and without the
generated `Column ...` headers.

### `topline`

The distribution of the answers to `--question`. Empty answers are counted as `No Response`.
Answers are not split, so `Red, Blue` is a single answer here.

### `crosstab`

The distribution of the answers to `--crosstab-results` within each answer to
`--crosstab-by`. In percentage mode, each group sums to 100.

The view is `absolute` (the default) or `percentage`.

With `--store` and `--title`, `questions`, `topline` and `crosstab` read the survey export
kept with that poll group instead of `--input`. The group is found with the slug built from
the title (lowercase, spaces replaced by `-`). A title with punctuation may not match the slug
given by the store (`Spring '24` is stored as `spring-24`), in which case the group is not
found.

### `roster`

Reads a JSON export of the content store and lists the team members in display order.
Each member points to the member just above it (`id_above`), the first member points to `"0"`.
A broken chain is reported and the members are listed in the stored order.

### `publish`

Ingests the survey and adds it as a new poll group to the content store export given with
`--store` (the file is created if it does not exist). The title comes from `--title`. The
poll group keeps both the ingested polls and the original CSV.

## Configuration

`boptally` comes with sensible defaults. The program accepts a configuration file in JSON.
All the fields are optional, and the command line flags take precedence.

```text
{
  "input": {
    "provider": "csv",
    "filePath": "spring.csv",
    "excelWorksheetName": "Form1"
  },
  "ingest": {
    "pruneThreshold": 3,
    "excludedPrefixes": ["Timestamp", "Column"],
    "multiSelectDelimiter": ", ",
    "defaultChart": "pie"
  },
  "aggregate": {
    "noResponseLabel": "No Response"
  },
  "visualizer": {
    "skippedLeadingColumns": 1,
    "hiddenPrefixes": ["Column"]
  },
  "analysis": {
    "kind": "crosstab",
    "crosstabBy": "Year",
    "crosstabResults": "Which color?",
    "view": "percentage",
    "storePath": "store.json",
    "title": "Spring survey"
  }
}
```

The file paths are relative to the location of the configuration file.

 */
