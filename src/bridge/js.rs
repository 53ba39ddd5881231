//! JavaScript snippets evaluated inside the page.
//!
//! The debugging protocol requires DOM inspection to happen page-side, so
//! these are transmitted as text. Snippets ending in a bare function are
//! used with `Runtime.callFunctionOn` (binding `this` to the element);
//! self-invoking snippets go through `Runtime.evaluate`.

/// Installed via `Page.addScriptToEvaluateOnNewDocument`. The empty `log`
/// function is expected on a fixed line: the debugger sets a breakpoint
/// there and extracts call-site arguments on pause.
pub const ON_NEW_DOCUMENT_JAVASCRIPT: &str = r"(function() {
    // Do not move this function somewhere else, because it is expected to
    // be found on line 6 by the debugger. It is intentionally left
    // empty because the debugger will intercept calls to it and
    // extract the arguments and the stack trace.
    function log(type, message) {
        var setBreakpointOnThisLine;
    }

    window.alert = function() {};
    window.confirm = function() {
        return true;
    };
    window.prompt = function() {
        return true;
    };
})();
";

/// Line of the `log` body inside [`ON_NEW_DOCUMENT_JAVASCRIPT`].
pub const ON_NEW_DOCUMENT_JAVASCRIPT_LINENO: i64 = 6;

/// Run on a call frame while paused at the `log` breakpoint. Serialises the
/// frame's arguments, dropping circular references.
pub const EXTRACT_ARGUMENTS_JAVASCRIPT: &str = r"(function(logArguments) {
    let retval = 'null';
    if (logArguments !== null) {
        let duplicateReferences = [];
        retval = JSON.stringify(logArguments, function(key, value) {
            if (typeof(value) === 'object' && value !== null) {
                if (duplicateReferences.indexOf(value) !== -1) {
                    try {
                        JSON.stringify(value)
                    } catch (e) {
                        return;
                    }
                } else {
                    duplicateReferences.push(value);
                }
            }
            return value;
        });
    }
    return retval;
})(typeof(arguments) !== 'undefined' ? Array.from(arguments) : null);
";

/// Headless detection: `window.chrome` is absent in headless builds.
pub const HEADLESS_PROBE: &str = r"(function() {
    return !window.chrome;
})();
";

/// Visibility test with descendant fallback. A zero-size element with a
/// visible child returns the child as the visible proxy.
pub const IS_VISIBLE_FUNCTION: &str = r"function isVisible(elem) {
    function parseValue(value) {
        var parsedValue = parseInt(value);
        if (isNaN(parsedValue)) {
            return 0;
        } else {
            return parsedValue;
        }
    }

    if (!elem) elem = this;
    if (!(elem instanceof Element)) return false;
    let visible = true;
    const style = getComputedStyle(elem);

    // for these rules the children cannot be visible, directly return
    if (style.display === 'none') return false;
    if (style.opacity < 0.1) return false;
    if (style.visibility !== 'visible') return false;

    // for these rules a child element might still be visible,
    // no direct return
    if (elem.offsetWidth + elem.offsetHeight + elem.getBoundingClientRect().height +
        elem.getBoundingClientRect().width === 0) {
        visible = false;
    }
    if (elem.offsetWidth < 10 || elem.offsetHeight < 10) {
        visible = false;
    }
    const elemCenter = {
        x: elem.getBoundingClientRect().left + elem.offsetWidth / 2,
        y: elem.getBoundingClientRect().top + elem.offsetHeight / 2
    };
    if (elemCenter.x < 0) visible = false;
    if (elemCenter.x > (document.documentElement.clientWidth || window.innerWidth)) visible = false;
    if (elemCenter.y < 0) visible = false;
    if (elemCenter.y > (document.documentElement.clientHeight || window.innerHeight)) visible = false;

    if (visible) {
        let pointContainer = document.elementFromPoint(elemCenter.x, elemCenter.y);
        do {
            if (pointContainer === elem) return elem;
            if (!pointContainer) break;
        } while (pointContainer = pointContainer.parentNode);

        pointContainer = document.elementFromPoint(elemCenter.x, elemCenter.y - (parseValue(style.fontSize)/2));
        do {
            if (pointContainer === elem) return elem;
            if (!pointContainer) break;
        } while (pointContainer = pointContainer.parentNode);
    }

    // check the child nodes
    if (!visible) {
        let childrenCount = elem.childNodes.length;
        for (var i = 0; i < childrenCount; i++) {
            let isChildVisible = isVisible(elem.childNodes[i]);
            if (isChildVisible) {
                return isChildVisible;
            }
        }
    }

    return false;
}";

pub const GET_TEXT_FUNCTION: &str = r"function getText(elem) {
    if (!elem) elem = this
    return {'text': elem.innerText}
}";

pub const CLICK_NODE_FUNCTION: &str = r"function clickNode(elem) {
    if (!elem) elem = this;
    elem.click();
}";

pub const GET_DIMENSIONS_FUNCTION: &str = r"function getDimensions(elem) {
    if (!elem) elem = this;
    domRect = elem.getBoundingClientRect()
    return {'x': domRect['x'], 'y': domRect['y'], 'width': domRect['width'], 'height': domRect['height']}
}";

/// All descendants whose computed cursor is `pointer`, reduced to covering
/// elements (an element is dropped when its parent is also in the set).
pub const FIND_CLICKABLES_FUNCTION: &str = r"function getClickableElements(elem) {
    function getAllClickables(elem) {
        const childElements = Array.from(elem.querySelectorAll('*'));
        const clickableElements = childElements.filter(element => {
            const style = getComputedStyle(element);
            return style.cursor === 'pointer';
        })
        return clickableElements;
    }
    function findCoveringNodes(nodes) {
        var coveringNodes = [];
        for (var i = 0; i < nodes.length; i++) {
            var node = nodes[i];
            var parentNode = node.parentNode;
            if (nodes.indexOf(parentNode) === -1) {
                coveringNodes.push(node);
            }
        }
        return coveringNodes;
    }

    if (!elem) elem = this;
    var nodes = getAllClickables(elem);
    var coveringNodes = findCoveringNodes(nodes);
    return coveringNodes
}";

/// Structural fields of a clickable plus its type: `link` for an href whose
/// pathname contains `/` and is longer than two characters, `checkbox` when
/// the element or a direct child carries `checked`/`ariaChecked`, `button`
/// otherwise.
pub const CLICKABLE_PROPERTIES_FUNCTION: &str = r"function extractProperties(elem) {
    if (!elem) elem = this;
    var computedStyle = getComputedStyle(elem);

    let clickable = new Object();
    clickable['localName'] = elem.localName;
    clickable['id'] = elem.id;
    clickable['type'] = elem.type;
    clickable['html'] = elem.outerHTML;
    clickable['text'] = elem.innerText;
    clickable['fontsize'] = computedStyle.fontSize;
    clickable['width'] = elem.offsetWidth;
    clickable['height'] = elem.offsetHeight;
    clickable['x'] = elem.getBoundingClientRect().left;
    clickable['y'] = elem.getBoundingClientRect().top;
    clickable['backgroundColor'] = computedStyle.backgroundColor;
    if (elem.firstElementChild != null && elem.firstElementChild.innerText) {
        clickable['backgroundColor'] =
            getComputedStyle(elem.firstElementChild).backgroundColor;
    }
    if (clickable['localName'] == 'a') {
        clickable['href'] = elem.href;
    }
    if ('href' in clickable) {
        let url = new URL(clickable['href']);
        if (url.pathname.includes('/') && url.pathname.length > 2) {
            clickable['type'] = 'link';
        } else {
            clickable['type'] = 'button';
        }
    }
    if (elem.hasChildNodes()) {
        for (node of elem.childNodes) {
            if (node.checked !== undefined ||
                'ariaChecked' in node && node.ariaChecked !== null) {
                clickable['type'] = 'checkbox';
                clickable['text'] = elem.innerText;
                clickable['checked'] = !!(node.checked || node.ariaChecked);
                break;
            }
        }
    }
    if (elem.checked !== undefined ||
        'ariaChecked' in elem && elem.ariaChecked !== null) {
        clickable['type'] = 'checkbox';
        clickable['text'] = elem.innerText;
        clickable['checked'] = !!(elem.checked || elem.ariaChecked);
    }
    if (!['checkbox', 'link'].includes(clickable['type'])) {
        clickable['type'] = 'button';
    }
    return {
        'localName': clickable['localName'],
        'html': clickable['html'],
        'text': clickable['text'],
        'fontsize': clickable['fontsize'],
        'width': clickable['width'],
        'height': clickable['height'],
        'x': clickable['x'],
        'y': clickable['y'],
        'type': clickable['type'],
        'backgroundColor': clickable['backgroundColor'],
        'href': clickable['href'],
        'checked': clickable['checked']
    }
}";

/// Geometry and identity of a banner candidate. A dimension reaching the
/// viewport reports the literal `full`.
pub const COOKIE_NOTICE_PROPERTIES_FUNCTION: &str = r"function getCookieNoticeProperties(elem) {
    if (!elem) elem = this;
    const style = getComputedStyle(elem);

    let width = elem.offsetWidth;
    if (width >= document.documentElement.clientWidth) {
        width = 'full';
    }
    let height = elem.offsetHeight;
    if (height >= document.documentElement.clientHeight) {
        height = 'full';
    }

    return {
        'html': elem.outerHTML,
        'has_id': elem.hasAttribute('id'),
        'has_class': elem.hasAttribute('class'),
        'id': elem.getAttribute('id'),
        'text': elem.innerText,
        'fontsize': style.fontSize,
        'width': width,
        'height': height,
        'x': elem.getBoundingClientRect().left,
        'y': elem.getBoundingClientRect().top,
    }
}";

/// Walk to the parent, stopping below `<body>`.
pub const GET_PARENT_NODE_FUNCTION: &str = r"function getParentNode(elem) {
    if (!elem) elem = this;
    if (elem.nodeName === 'BODY') {
        return false
    }
    if (elem.parentNode.nodeName !== 'BODY') {
        return elem.parentNode
    } else {
        return false
    }
}";

/// Walk up while the parent still fits the detected contour: its rectangle
/// within the bounding box and its area between the current node's and the
/// contour's.
pub const PARENT_WHILE_AREA_INCREASES_FUNCTION: &str = r"function getParentNodeWhileAreaIncreases(elem, minX, maxX, minY, maxY, maxArea) {
    var originalArea = elem.offsetHeight * elem.offsetWidth;

    var previousNode = elem;
    var currentNode = elem.parentNode;

    while (currentNode && currentNode !== document.body) {
        var currentNodeRect = currentNode.getBoundingClientRect();
        var currentNodeArea = currentNode.offsetHeight * currentNode.offsetWidth;

        if (currentNodeArea >= originalArea &&
            currentNodeArea <= maxArea &&
            minX <= currentNodeRect.x && currentNodeRect.x <= maxX &&
            minY <= currentNodeRect.y && currentNodeRect.y <= maxY) {
            previousNode = currentNode;
            currentNode = currentNode.parentNode;
        } else {
            return previousNode;
        }
    }
    return previousNode;
}";

/// Body HTML and inner text, for the privacy-policy extraction.
pub const GET_BODY_CONTENT_FUNCTION: &str = r"function getText() {
    elem = document.body
    if (!elem) elem = this;

    return {
        'html': elem.outerHTML,
        'text': elem.innerText,
    }
}";

/// Candidate gathering for the classifier detector: visible elements with a
/// positive stacking index plus the first three and last three visible
/// element children of the body.
pub const GATHER_CLASSIFIER_CANDIDATES: &str = r"(function() {
    function isVisible(elem) {
        if (!elem) elem = this
        if (!(elem instanceof Element)) throw Error('DomUtil: elem is not an element.');
        const style = getComputedStyle(elem);
        if (style.display === 'none') return false;
        if (style.visibility !== 'visible') return false;
        if (style.opacity < 0.1) return false;
        if (elem.offsetWidth + elem.offsetHeight + elem.getBoundingClientRect().height +
            elem.getBoundingClientRect().width === 0) {
            return false;
        }
        const elemCenter = {
            x: elem.getBoundingClientRect().left + elem.offsetWidth / 2,
            y: elem.getBoundingClientRect().top + elem.offsetHeight / 2
        };
        if (elemCenter.x < 0) return false;
        if (elemCenter.x > (document.documentElement.clientWidth || window.innerWidth)) return false;
        if (elemCenter.y < 0) return false;
        if (elemCenter.y > (document.documentElement.clientHeight || window.innerHeight)) return false;
        if (isNaN(elemCenter.x) || isNaN(elemCenter.y)) return false;
        let pointContainer = document.elementFromPoint(elemCenter.x, elemCenter.y);
        do {
            if (pointContainer === elem) return true;
        } while (pointContainer = pointContainer.parentNode);
        return false;
    }

    function gatherZscoreCandidates() {
        let candidates = [];
        let bodyChildNodes = document.body.querySelectorAll('*');
        bodyChildNodes.forEach((node) => {
            if (node.nodeType !== Node.ELEMENT_NODE)
                return;
            let computedStyle = getComputedStyle(node);
            if (isVisible(node) && computedStyle.zIndex > 0) {
                candidates.push(node);
            }
        })
        let nodeIndex = 0;
        for (i = 0; i < 3; i++) {
            if (nodeIndex == bodyChildNodes.length - 1) {
                break;
            }
            let currentNode = bodyChildNodes[nodeIndex];
            if (currentNode.nodeType !== Node.ELEMENT_NODE ||
                !isVisible(currentNode) ||
                candidates.includes(currentNode)) {
                i--;
                nodeIndex++;
                continue;
            } else {
                candidates.push(currentNode);
                nodeIndex++;
            }
        }
        nodeIndex = bodyChildNodes.length - 1;
        for (i = 0; i < 3; i++) {
            if (nodeIndex < 0) {
                break;
            }
            let currentNode = bodyChildNodes[nodeIndex];
            if (currentNode.nodeType !== Node.ELEMENT_NODE ||
                !isVisible(currentNode) ||
                candidates.includes(currentNode)) {
                i--;
                nodeIndex--;
                continue;
            } else {
                candidates.push(currentNode);
                nodeIndex--;
            }
        }
        return candidates;
    }

    return gatherZscoreCandidates();
})();
";

/// Strip all embedded images before the perceptive screenshot.
pub const REMOVE_IMAGES_SNIPPET: &str = r"for (var i = document.images.length; i-- > 0;)
    document.images[i].parentNode.removeChild(document.images[i])
";

pub const BODY_INNER_TEXT: &str = "document.body.innerText";

/// Consent state sometimes lives in local storage instead of cookies;
/// clearing it keeps the banner reappearing across replays.
pub const LOCAL_STORAGE_CLEAR: &str = "localStorage.clear()";

/// Union of elements matched by a set of filter-list selectors. The
/// `__rules__` placeholder receives a JSON array of selector strings.
pub const FILTER_QUERY_TEMPLATE: &str = r"(function() {
    let rules = __rules__;
    let cookie_notices = [];

    rules.forEach(function(rule) {
        let elements = document.querySelectorAll(rule);
        elements.forEach(function(element) {
            cookie_notices.push(element);
        });
    });

    return cookie_notices;
})();
";

/// Modality probe. The `__cookie_notice__` placeholder receives the banner
/// rectangle as JSON; probes that land inside it are skipped, and the page
/// is modal when hit-testing returns one element for every remaining probe.
pub const MODALITY_PROBE_TEMPLATE: &str = r"(function modal() {
    let margin = 5;
    let cookieNotice = __cookie_notice__;

    let viewportWidth = document.documentElement.clientWidth;
    let viewportHeight = document.documentElement.clientHeight;
    let viewportVerticalCenter = viewportHeight / 2;

    let testPositions = [
        {'x': margin, 'y': margin},
        {'x': margin, 'y': viewportVerticalCenter},
        {'x': margin, 'y': viewportHeight - margin},
        {'x': viewportVerticalCenter, 'y': margin},
        {'x': viewportVerticalCenter, 'y': viewportHeight - margin},
        {'x': viewportWidth - margin, 'y': margin},
        {'x': viewportWidth - margin, 'y': viewportVerticalCenter},
        {'x': viewportWidth - margin, 'y': viewportHeight - margin},
    ];

    if (cookieNotice) {
        if (cookieNotice.width == 'full') {
            cookieNotice.width = viewportWidth;
        }
        if (cookieNotice.height == 'full') {
            cookieNotice.height = viewportHeight;
        }
        for (var i = 0; i < testPositions.length; i++) {
            let testPosition = testPositions[i];
            if ((testPosition.x >= cookieNotice.x && testPosition.x <= (cookieNotice.x + cookieNotice.width)) &&
                    (testPosition.y >= cookieNotice.y && testPosition.y <=
                    (cookieNotice.y + cookieNotice.height))) {
                let index = testPositions.indexOf(testPosition);
                testPositions.splice(index, 1);
            }
        }
    }

    let previousContainer = document.elementFromPoint(testPositions[0].x, testPositions[0].y);
    for (var i = 1; i < testPositions.length; i++) {
        let testPosition = testPositions[i];
        let testContainer = document.elementFromPoint(testPosition.x, testPosition.y);
        if (previousContainer !== testContainer) {
            return false;
        }
        previousContainer = testContainer;
    }
    return true;
})();
";
